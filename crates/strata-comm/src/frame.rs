//! Raw output frames.
//!
//! A frame is every interior cell of the global grid, row by row from the
//! top, each cell's populations as consecutive `f64` in native byte
//! order. Ghost rows and ghost columns never reach a frame. There is no
//! header and no padding, so a frame of a `W x H` domain with `D`
//! directions is exactly `W * H * D * 8` bytes, and a file of frames is
//! just their concatenation.

use std::io::{self, Read, Write};

use strata_core::VALUE_BYTES;
use strata_mesh::Mesh;

use crate::partition::GlobalDomain;

/// Size in bytes of one frame of `domain` with `directions` populations.
pub fn frame_bytes(domain: GlobalDomain, directions: usize) -> usize {
    domain
        .cell_count()
        .saturating_mul(directions)
        .saturating_mul(VALUE_BYTES)
}

/// Write the interior of `mesh` (ghost rows and columns stripped) to
/// `sink`. Returns the number of bytes written.
pub fn write_interior<W: Write + ?Sized>(sink: &mut W, mesh: &Mesh) -> io::Result<usize> {
    let d = mesh.directions();
    let row_len = mesh.row_len();
    if mesh.width() < 2 {
        return Ok(0);
    }
    let mut buf = Vec::with_capacity((row_len - 2 * d) * VALUE_BYTES);
    let mut written = 0;
    for r in mesh.interior_rows() {
        buf.clear();
        for v in &mesh.row(r)[d..row_len - d] {
            buf.extend_from_slice(&v.to_ne_bytes());
        }
        sink.write_all(&buf)?;
        written += buf.len();
    }
    Ok(written)
}

/// Output sink that knows the frame size and counts what passes through.
///
/// Bytes are forwarded unchanged to the wrapped writer.
/// [`end_frame()`](FrameWriter::end_frame) seals a frame and fails if the
/// bytes written since the previous seal are not exactly one frame. A
/// short frame stays open and can still be completed. An over-long frame
/// leaves the stream misaligned, so it poisons the writer: every later
/// write and seal fails.
///
/// # Examples
///
/// ```
/// use strata_comm::frame::FrameWriter;
/// use strata_comm::partition::GlobalDomain;
/// use std::io::Write;
///
/// let mut out = FrameWriter::new(Vec::new(), GlobalDomain::new(2, 1), 1);
/// out.write_all(&1.0f64.to_ne_bytes()).unwrap();
/// assert!(out.end_frame().is_err()); // only half a frame
/// out.write_all(&2.0f64.to_ne_bytes()).unwrap();
/// out.end_frame().unwrap(); // the open frame is now complete
/// assert_eq!(out.frames_written(), 1);
/// ```
#[derive(Debug)]
pub struct FrameWriter<W: Write> {
    inner: W,
    frame_bytes: usize,
    pending: usize,
    frames: u64,
    bytes: u64,
    poisoned: bool,
}

impl<W: Write> FrameWriter<W> {
    /// Wrap `inner` for frames of `domain` with `directions` populations.
    pub fn new(inner: W, domain: GlobalDomain, directions: usize) -> Self {
        Self {
            inner,
            frame_bytes: frame_bytes(domain, directions),
            pending: 0,
            frames: 0,
            bytes: 0,
            poisoned: false,
        }
    }

    /// Expected size of one frame in bytes.
    pub fn frame_bytes(&self) -> usize {
        self.frame_bytes
    }

    /// Seal the current frame and flush.
    ///
    /// Fails with `InvalidData` if the bytes written since the last seal
    /// do not make up exactly one frame. A short frame stays open; an
    /// over-long one poisons the writer.
    pub fn end_frame(&mut self) -> io::Result<()> {
        self.check_poisoned()?;
        if self.pending < self.frame_bytes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "incomplete frame: wrote {} of {} bytes",
                    self.pending, self.frame_bytes
                ),
            ));
        }
        if self.pending > self.frame_bytes {
            self.poisoned = true;
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "over-long frame: wrote {} of {} bytes",
                    self.pending, self.frame_bytes
                ),
            ));
        }
        self.pending = 0;
        self.frames += 1;
        self.inner.flush()
    }

    /// Whether an over-long frame has made the stream unusable.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    fn check_poisoned(&self) -> io::Result<()> {
        if self.poisoned {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "frame stream misaligned by an earlier over-long frame",
            ));
        }
        Ok(())
    }

    /// Frames sealed so far.
    pub fn frames_written(&self) -> u64 {
        self.frames
    }

    /// Bytes forwarded so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes
    }

    /// Borrow the wrapped writer.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Consume the frame writer and return the wrapped writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for FrameWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.check_poisoned()?;
        let n = self.inner.write(buf)?;
        self.pending += n;
        self.bytes += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// One decoded frame: the global grid's interior populations.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    domain: GlobalDomain,
    directions: usize,
    values: Vec<f64>,
}

impl Frame {
    /// Global extent of the frame.
    pub fn domain(&self) -> GlobalDomain {
        self.domain
    }

    /// Populations per cell.
    pub fn directions(&self) -> usize {
        self.directions
    }

    /// Global row `row`, `width * directions` values.
    pub fn row(&self, row: usize) -> &[f64] {
        let len = self.domain.width * self.directions;
        &self.values[row * len..(row + 1) * len]
    }

    /// Populations of global cell `(row, col)`.
    pub fn cell(&self, row: usize, col: usize) -> &[f64] {
        let start = (row * self.domain.width + col) * self.directions;
        &self.values[start..start + self.directions]
    }

    /// All values, row-major.
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Reads frames back from a concatenated frame stream.
#[derive(Debug)]
pub struct FrameReader<R: Read> {
    inner: R,
    domain: GlobalDomain,
    directions: usize,
    frames: u64,
}

impl<R: Read> FrameReader<R> {
    /// Read frames of `domain` with `directions` populations from `inner`.
    pub fn new(inner: R, domain: GlobalDomain, directions: usize) -> Self {
        Self {
            inner,
            domain,
            directions,
            frames: 0,
        }
    }

    /// Frames read so far.
    pub fn frames_read(&self) -> u64 {
        self.frames
    }

    /// Read the next frame.
    ///
    /// Returns `Ok(None)` at a clean end of stream and `UnexpectedEof`
    /// if the stream ends partway through a frame. A domain without cells
    /// has no frames at all.
    pub fn next_frame(&mut self) -> io::Result<Option<Frame>> {
        let len = frame_bytes(self.domain, self.directions);
        if len == 0 {
            return Ok(None);
        }
        let mut buf = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        if filled == 0 {
            return Ok(None);
        }
        if filled < len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("truncated frame: read {filled} of {len} bytes"),
            ));
        }
        let values = buf
            .chunks_exact(VALUE_BYTES)
            .map(|chunk| {
                let mut raw = [0u8; VALUE_BYTES];
                raw.copy_from_slice(chunk);
                f64::from_ne_bytes(raw)
            })
            .collect();
        self.frames += 1;
        Ok(Some(Frame {
            domain: self.domain,
            directions: self.directions,
            values,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interior_strips_ghost_rows_and_columns() {
        // 2x2 interior, 1 direction, padded to 4x4.
        let mut m = Mesh::new(4, 4, 1).unwrap();
        m.fill(-1.0);
        m.cell_mut(1, 1)[0] = 1.0;
        m.cell_mut(1, 2)[0] = 2.0;
        m.cell_mut(2, 1)[0] = 3.0;
        m.cell_mut(2, 2)[0] = 4.0;
        let mut out = Vec::new();
        let n = write_interior(&mut out, &m).unwrap();
        assert_eq!(n, 4 * VALUE_BYTES);

        let mut reader = FrameReader::new(out.as_slice(), GlobalDomain::new(2, 2), 1);
        let frame = reader.next_frame().unwrap().unwrap();
        assert_eq!(frame.values(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(frame.row(1), &[3.0, 4.0]);
        assert_eq!(frame.cell(0, 1), &[2.0]);
        assert!(reader.next_frame().unwrap().is_none());
        assert_eq!(reader.frames_read(), 1);
    }

    #[test]
    fn frame_size_matches_domain() {
        assert_eq!(frame_bytes(GlobalDomain::new(10, 6), 9), 10 * 6 * 9 * 8);
    }

    #[test]
    fn empty_domain_yields_no_frames() {
        let mut reader = FrameReader::new(io::empty(), GlobalDomain::new(0, 5), 9);
        assert!(reader.next_frame().unwrap().is_none());
        assert!(reader.next_frame().unwrap().is_none());
        assert_eq!(reader.frames_read(), 0);
    }

    #[test]
    fn truncated_stream_is_an_error() {
        let bytes = vec![0u8; 12];
        let mut reader = FrameReader::new(bytes.as_slice(), GlobalDomain::new(2, 1), 1);
        let err = reader.next_frame().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn writer_counts_frames_and_bytes() {
        let mut w = FrameWriter::new(Vec::new(), GlobalDomain::new(1, 1), 2);
        assert_eq!(w.frame_bytes(), 16);
        for _ in 0..3 {
            w.write_all(&[0u8; 16]).unwrap();
            w.end_frame().unwrap();
        }
        assert_eq!(w.frames_written(), 3);
        assert_eq!(w.bytes_written(), 48);
        assert_eq!(w.into_inner().len(), 48);
    }

    #[test]
    fn overlong_frame_poisons_the_writer() {
        let mut w = FrameWriter::new(Vec::new(), GlobalDomain::new(1, 1), 1);
        w.write_all(&[0u8; 16]).unwrap();
        let err = w.end_frame().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert_eq!(w.frames_written(), 0);
        assert!(w.is_poisoned());

        assert!(w.write_all(&[0u8; 8]).is_err());
        assert!(w.end_frame().is_err());
        assert_eq!(w.bytes_written(), 16);
    }

    #[test]
    fn short_frame_stays_open_until_completed() {
        let mut w = FrameWriter::new(Vec::new(), GlobalDomain::new(2, 1), 1);
        w.write_all(&1.0f64.to_ne_bytes()).unwrap();
        assert_eq!(w.end_frame().unwrap_err().kind(), io::ErrorKind::InvalidData);
        assert_eq!(w.frames_written(), 0);

        w.write_all(&2.0f64.to_ne_bytes()).unwrap();
        w.end_frame().unwrap();
        assert_eq!(w.frames_written(), 1);
        assert!(!w.is_poisoned());

        // The next frame starts from zero and the stream stays aligned.
        w.write_all(&[0u8; 16]).unwrap();
        w.end_frame().unwrap();
        let bytes = w.into_inner();
        let mut reader = FrameReader::new(bytes.as_slice(), GlobalDomain::new(2, 1), 1);
        assert_eq!(reader.next_frame().unwrap().unwrap().values(), &[1.0, 2.0]);
        assert_eq!(reader.next_frame().unwrap().unwrap().values(), &[0.0, 0.0]);
        assert!(reader.next_frame().unwrap().is_none());
    }
}

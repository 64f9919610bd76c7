use std::io::{self, ErrorKind, Read, Write};

/// Buffer size used by every copy loop unless the caller overrides it.
pub const DEFAULT_BUFFER_SIZE: usize = 4 * 1024;

/// Releases a writable handle, discarding any error raised by the final flush.
///
/// Dropping the handle closes it; the flush happens first so buffered bytes
/// still get a chance to reach the underlying sink.
///
/// # Arguments
///
/// * `handle` - The handle to release. Ownership is taken so it cannot be used afterwards.
pub fn close_quietly<W: Write>(mut handle: W) {
    let _ = handle.flush();
}

/// Copies everything from `source` into `sink` using a buffer of [`DEFAULT_BUFFER_SIZE`] bytes.
///
/// # Errors
///
/// Returns the first I/O error raised by either side.
pub fn copy<R, W>(source: &mut R, sink: &mut W) -> io::Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    copy_with_buffer(source, sink, DEFAULT_BUFFER_SIZE)
}

/// Copies everything from `source` into `sink`, reading at most `buffer_size` bytes at a time.
///
/// Neither side is closed. A read returning zero bytes marks the end of the data.
///
/// # Arguments
///
/// * `source` - The reader to drain.
/// * `sink` - The writer that receives exactly the bytes read.
/// * `buffer_size` - Upper bound for a single read.
///
/// # Returns
///
/// * `Ok(u64)` with the number of bytes copied.
/// * `Err(io::Error)` if a read or write fails, or `buffer_size` is zero.
pub fn copy_with_buffer<R, W>(source: &mut R, sink: &mut W, buffer_size: usize) -> io::Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    if buffer_size == 0 {
        return Err(io::Error::new(
            ErrorKind::InvalidInput,
            "buffer size must be greater than zero",
        ));
    }

    let mut buffer = vec![0u8; buffer_size];
    let mut copied = 0u64;
    loop {
        let n = match source.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        sink.write_all(&buffer[..n])?;
        copied += n as u64;
    }

    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Hands out at most `chunk` bytes per read and counts the calls.
    struct Trickle {
        data: Cursor<Vec<u8>>,
        chunk: usize,
        reads: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reads += 1;
            let limit = buf.len().min(self.chunk);
            self.data.read(&mut buf[..limit])
        }
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(ErrorKind::Other, "device unplugged"))
        }
    }

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(ErrorKind::Other, "disk full"))
        }
    }

    #[test]
    fn copies_all_bytes_across_buffer_boundaries() {
        for size in [0usize, 1, 4095, 4096, 4097, 100_000] {
            let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
            let mut sink: Vec<u8> = Vec::new();
            let copied = copy(&mut Cursor::new(data.clone()), &mut sink).unwrap();
            assert_eq!(copied, size as u64);
            assert_eq!(sink, data, "mismatch for {} bytes", size);
        }
    }

    #[test]
    fn never_reads_more_than_the_buffer_size() {
        let mut source = Trickle {
            data: Cursor::new(vec![7u8; 10]),
            chunk: usize::MAX,
            reads: 0,
        };
        let mut sink: Vec<u8> = Vec::new();
        copy_with_buffer(&mut source, &mut sink, 3).unwrap();
        assert_eq!(sink, vec![7u8; 10]);
        // 3 + 3 + 3 + 1, then the terminating zero read
        assert_eq!(source.reads, 5);
    }

    #[test]
    fn handles_short_reads() {
        let mut source = Trickle {
            data: Cursor::new(b"hello world".to_vec()),
            chunk: 2,
            reads: 0,
        };
        let mut sink: Vec<u8> = Vec::new();
        assert_eq!(copy(&mut source, &mut sink).unwrap(), 11);
        assert_eq!(sink, b"hello world");
    }

    #[test]
    fn propagates_read_errors() {
        let mut sink: Vec<u8> = Vec::new();
        let err = copy(&mut Broken, &mut sink).unwrap_err();
        assert_eq!(err.to_string(), "device unplugged");
        assert!(sink.is_empty());
    }

    #[test]
    fn propagates_write_errors() {
        let err = copy(&mut Cursor::new(b"abc".to_vec()), &mut Broken).unwrap_err();
        assert_eq!(err.to_string(), "disk full");
    }

    #[test]
    fn empty_source_writes_nothing() {
        let copied = copy(&mut Cursor::new(Vec::<u8>::new()), &mut Broken).unwrap();
        assert_eq!(copied, 0);
    }

    #[test]
    fn rejects_zero_buffer_size() {
        let mut sink: Vec<u8> = Vec::new();
        let err = copy_with_buffer(&mut Cursor::new(b"abc".to_vec()), &mut sink, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn close_quietly_swallows_flush_errors() {
        close_quietly(Broken);
        close_quietly(Vec::<u8>::new());
    }
}

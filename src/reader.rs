//! gmon-profile binary reader module.

use crate::config::Address;
use crate::error::Result;
use byteorder::{NativeEndian, ReadBytesExt};
use std::io::{self, Read};

/// Sequential cursor over the raw bytes of a gmon file.
///
/// Every read either fully succeeds or fails with an I/O error. A failed
/// read leaves no partial field behind and latches the reader: from then
/// on [`ByteReader::read_tag`] reports end of file, so the source is
/// treated as exhausted.
#[derive(Debug)]
pub struct ByteReader<R> {
    inner: R,
    failed: bool,
}

impl<R: Read> ByteReader<R> {
    /// Wraps a byte source.
    pub fn new(inner: R) -> Self {
        ByteReader {
            inner,
            failed: false,
        }
    }

    /// Reads one platform word (a VMA). The word size and byte order of
    /// the file are assumed to match the decoding host.
    #[cfg(target_pointer_width = "64")]
    pub fn read_vma(&mut self) -> Result<Address> {
        let r = self.inner.read_u64::<NativeEndian>();
        self.track(r)
    }

    /// Reads one platform word (a VMA). The word size and byte order of
    /// the file are assumed to match the decoding host.
    #[cfg(target_pointer_width = "32")]
    pub fn read_vma(&mut self) -> Result<Address> {
        let r = self.inner.read_u32::<NativeEndian>();
        Ok(Address::from(self.track(r)?))
    }

    /// Reads a 32-bit integer.
    pub fn read_u32(&mut self) -> Result<u32> {
        let r = self.inner.read_u32::<NativeEndian>();
        self.track(r)
    }

    /// Reads a 64-bit integer.
    pub fn read_u64(&mut self) -> Result<u64> {
        let r = self.inner.read_u64::<NativeEndian>();
        self.track(r)
    }

    /// Reads a 16-bit sample unit.
    pub fn read_unit(&mut self) -> Result<u16> {
        let r = self.inner.read_u16::<NativeEndian>();
        self.track(r)
    }

    /// Fills the buffer completely or fails.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        let r = self.inner.read_exact(buf);
        self.track(r)
    }

    /// Reads bytes until a zero byte is reached; fails if the stream
    /// ends first.
    pub fn read_string(&mut self) -> Result<String> {
        let mut bytes = Vec::new();
        loop {
            let r = self.inner.read_u8();
            let c = self.track(r)?;
            if c == 0 {
                return Ok(String::from_utf8_lossy(&bytes).into_owned());
            }
            bytes.push(c);
        }
    }

    /// Reads the next record tag. Returns `None` on a clean end of file
    /// at the tag boundary, and likewise once any earlier read failed.
    pub fn read_tag(&mut self) -> Result<Option<u8>> {
        if self.failed {
            return Ok(None);
        }
        match self.inner.read_u8() {
            Ok(tag) => Ok(Some(tag)),
            Err(ref e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn track<T>(&mut self, result: io::Result<T>) -> Result<T> {
        if result.is_err() {
            self.failed = true;
        }
        Ok(result?)
    }
}

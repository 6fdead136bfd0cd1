//! Minimal streaming container of named byte entries.
//!
//! Each entry is a LEB128-prefixed UTF-8 name, a `u64` little-endian payload
//! length and the payload. A clean end of input between entries ends the
//! stream. An atlas package holds exactly [`DIRECTORY_ENTRY`] and
//! [`SHEET_ENTRY`].

use crate::codec::write_str;
use crate::error::{AtlasError, FormatError, Result};
use std::io::{self, Read, Write};

pub const DIRECTORY_ENTRY: &str = "atlas.bin";
pub const SHEET_ENTRY: &str = "sheet.png";

/// Longest accepted entry name in bytes.
pub const MAX_ENTRY_NAME: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub data: Vec<u8>,
}

pub struct ContainerWriter<W: Write> {
    inner: W,
}

impl<W: Write> ContainerWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn write_entry(&mut self, name: &str, data: &[u8]) -> Result<()> {
        if name.len() > MAX_ENTRY_NAME {
            return Err(AtlasError::InvalidInput(format!(
                "entry name is {} bytes, limit is {MAX_ENTRY_NAME}",
                name.len()
            )));
        }
        write_str(&mut self.inner, name)?;
        self.inner.write_all(&(data.len() as u64).to_le_bytes())?;
        self.inner.write_all(data)?;
        Ok(())
    }

    /// Flushes and returns the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

pub struct ContainerReader<R: Read> {
    inner: R,
    origin: String,
}

fn truncated(e: io::Error, what: &'static str) -> std::result::Result<FormatError, AtlasError> {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        Ok(FormatError::Truncated(what))
    } else {
        Err(AtlasError::Io(e))
    }
}

impl<R: Read> ContainerReader<R> {
    /// `origin` names the package in error messages (usually its path).
    pub fn new(inner: R, origin: impl Into<String>) -> Self {
        Self {
            inner,
            origin: origin.into(),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    fn fail(&self, kind: FormatError) -> AtlasError {
        kind.in_atlas(self.origin.clone())
    }

    fn read_exact_or(&mut self, buf: &mut [u8], what: &'static str) -> Result<()> {
        match self.inner.read_exact(buf) {
            Ok(()) => Ok(()),
            Err(e) => Err(match truncated(e, what) {
                Ok(kind) => self.fail(kind),
                Err(io) => io,
            }),
        }
    }

    /// Returns `Ok(None)` once the input ends on an entry boundary.
    pub fn next_entry(&mut self) -> Result<Option<Entry>> {
        let mut first = [0u8; 1];
        let n = loop {
            match self.inner.read(&mut first) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };
        if n == 0 {
            return Ok(None);
        }

        let mut byte = first[0];
        let mut len: usize = 0;
        let mut shift = 0u32;
        loop {
            len |= ((byte & 0x7f) as usize) << shift;
            if len > MAX_ENTRY_NAME {
                return Err(self.fail(FormatError::BadLength));
            }
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
            if shift > 14 {
                return Err(self.fail(FormatError::BadLength));
            }
            let mut next = [0u8; 1];
            self.read_exact_or(&mut next, "entry name")?;
            byte = next[0];
        }

        let mut name = vec![0u8; len];
        self.read_exact_or(&mut name, "entry name")?;
        let name = String::from_utf8(name).map_err(|_| self.fail(FormatError::InvalidUtf8))?;

        let mut size = [0u8; 8];
        self.read_exact_or(&mut size, "entry length")?;
        let size = u64::from_le_bytes(size);

        let mut data = Vec::new();
        let read = (&mut self.inner).take(size).read_to_end(&mut data)?;
        if (read as u64) < size {
            return Err(self.fail(FormatError::Truncated("entry data")));
        }
        Ok(Some(Entry { name, data }))
    }
}

impl<R: Read> Iterator for ContainerReader<R> {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().transpose()
    }
}

/// The two payloads of an atlas package.
#[derive(Debug, Clone)]
pub struct PackageEntries {
    pub directory: Vec<u8>,
    pub sheet: Vec<u8>,
}

/// Reads a whole package, accepting the two entries in either order.
/// Unknown or repeated entries and missing ones are format errors.
pub fn read_package<R: Read>(reader: R, origin: impl Into<String>) -> Result<PackageEntries> {
    let mut reader = ContainerReader::new(reader, origin);
    let mut directory = None;
    let mut sheet = None;
    while let Some(entry) = reader.next_entry()? {
        let slot = match entry.name.as_str() {
            DIRECTORY_ENTRY => &mut directory,
            SHEET_ENTRY => &mut sheet,
            _ => return Err(reader.fail(FormatError::UnexpectedEntry(entry.name.clone()))),
        };
        if slot.is_some() {
            return Err(reader.fail(FormatError::DuplicateEntry(entry.name.clone())));
        }
        *slot = Some(entry.data);
    }
    let directory =
        directory.ok_or_else(|| reader.fail(FormatError::MissingEntry(DIRECTORY_ENTRY)))?;
    let sheet = sheet.ok_or_else(|| reader.fail(FormatError::MissingEntry(SHEET_ENTRY)))?;
    Ok(PackageEntries { directory, sheet })
}

/// Writes a package with the directory first.
pub fn write_package<W: Write>(writer: W, directory: &[u8], sheet: &[u8]) -> Result<W> {
    let mut w = ContainerWriter::new(writer);
    w.write_entry(DIRECTORY_ENTRY, directory)?;
    w.write_entry(SHEET_ENTRY, sheet)?;
    w.finish()
}

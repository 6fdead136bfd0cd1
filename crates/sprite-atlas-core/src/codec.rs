//! Binary layout of the sprite directory (`atlas.bin`).
//!
//! Little-endian throughout:
//!
//! ```text
//! filterMode : i32
//! count      : i32
//! count × { name: str, position: 2×f32, size: 2×f32, origin: 2×f32,
//!           border: 4×f32 (l,t,r,b), tileX: u8, tileY: u8, hollow: u8,
//!           color: str }
//! ```
//!
//! `str` is an unsigned LEB128 byte length followed by UTF-8 bytes.

use crate::config::FilterMode;
use crate::error::FormatError;
use crate::model::{Border, SpriteDefinition, SpriteDirectory};
use glam::Vec2;
use std::collections::HashSet;
use std::io::{self, Write};

/// Upper bound accepted for a single length-prefixed string.
pub const MAX_STRING_LEN: usize = 1 << 20;

pub fn write_str<W: Write>(w: &mut W, s: &str) -> io::Result<()> {
    let mut n = s.len() as u64;
    loop {
        let mut byte = (n & 0x7f) as u8;
        n >>= 7;
        if n != 0 {
            byte |= 0x80;
        }
        w.write_all(&[byte])?;
        if n == 0 {
            break;
        }
    }
    w.write_all(s.as_bytes())
}

fn write_vec2<W: Write>(w: &mut W, v: Vec2) -> io::Result<()> {
    w.write_all(&v.x.to_le_bytes())?;
    w.write_all(&v.y.to_le_bytes())
}

/// Serializes `dir` in record order.
pub fn encode_directory<W: Write>(dir: &SpriteDirectory, w: &mut W) -> io::Result<()> {
    let count = i32::try_from(dir.sprites.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "too many sprites"))?;
    w.write_all(&dir.filter_mode.to_i32().to_le_bytes())?;
    w.write_all(&count.to_le_bytes())?;
    for (name, def) in &dir.sprites {
        write_str(w, name)?;
        write_vec2(w, def.position)?;
        write_vec2(w, def.size)?;
        write_vec2(w, def.origin)?;
        for v in def.border.to_array() {
            w.write_all(&v.to_le_bytes())?;
        }
        w.write_all(&[def.tile_x as u8, def.tile_y as u8, def.hollow as u8])?;
        write_str(w, &def.color)?;
    }
    Ok(())
}

/// Forward-only reader over a byte slice.
pub(crate) struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], FormatError> {
        if self.remaining() < n {
            return Err(FormatError::Truncated(what));
        }
        let s = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    fn u8(&mut self, what: &'static str) -> Result<u8, FormatError> {
        Ok(self.take(1, what)?[0])
    }

    fn bool(&mut self, what: &'static str) -> Result<bool, FormatError> {
        Ok(self.u8(what)? != 0)
    }

    fn i32(&mut self, what: &'static str) -> Result<i32, FormatError> {
        let b = self.take(4, what)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn f32(&mut self, what: &'static str) -> Result<f32, FormatError> {
        let b = self.take(4, what)?;
        Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn vec2(&mut self, what: &'static str) -> Result<Vec2, FormatError> {
        Ok(Vec2::new(self.f32(what)?, self.f32(what)?))
    }

    pub(crate) fn str(&mut self, what: &'static str, max: usize) -> Result<String, FormatError> {
        let mut len: u64 = 0;
        let mut shift = 0u32;
        loop {
            let byte = self.u8(what)?;
            if shift >= 63 && (byte & 0x7f) > 1 {
                return Err(FormatError::BadLength);
            }
            len |= ((byte & 0x7f) as u64) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
            if shift > 63 {
                return Err(FormatError::BadLength);
            }
        }
        let len = usize::try_from(len).map_err(|_| FormatError::BadLength)?;
        if len > max {
            return Err(FormatError::BadLength);
        }
        let bytes = self.take(len, what)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| FormatError::InvalidUtf8)
    }
}

/// Parses a complete sprite directory. The whole slice must be consumed.
pub fn decode_directory(bytes: &[u8]) -> Result<SpriteDirectory, FormatError> {
    let mut r = ByteReader::new(bytes);
    let mode = r.i32("filter mode")?;
    let filter_mode = FilterMode::from_i32(mode).ok_or(FormatError::UnknownFilterMode(mode))?;
    let count = r.i32("sprite count")?;
    if count < 0 {
        return Err(FormatError::NegativeCount(count));
    }

    // each record is at least 45 bytes, so don't trust `count` for capacity
    let mut sprites = Vec::with_capacity((count as usize).min(r.remaining() / 45));
    let mut seen = HashSet::new();
    for _ in 0..count {
        let name = r.str("sprite name", MAX_STRING_LEN)?;
        let position = r.vec2("position")?;
        let size = r.vec2("size")?;
        let origin = r.vec2("origin")?;
        let border = Border::new(
            r.f32("border")?,
            r.f32("border")?,
            r.f32("border")?,
            r.f32("border")?,
        );
        let tile_x = r.bool("tile flags")?;
        let tile_y = r.bool("tile flags")?;
        let hollow = r.bool("hollow flag")?;
        let color = r.str("color", MAX_STRING_LEN)?;
        if !seen.insert(name.clone()) {
            return Err(FormatError::DuplicateSprite(name));
        }
        sprites.push((
            name,
            SpriteDefinition {
                position,
                size,
                origin,
                border,
                tile_x,
                tile_y,
                hollow,
                color,
            },
        ));
    }
    if r.remaining() != 0 {
        return Err(FormatError::TrailingBytes(r.remaining()));
    }
    Ok(SpriteDirectory {
        filter_mode,
        sprites,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leb(n: usize) -> Vec<u8> {
        let s = "x".repeat(n);
        let mut out = Vec::new();
        write_str(&mut out, &s).unwrap();
        out.truncate(out.len() - n);
        out
    }

    #[test]
    fn leb128_prefix_bytes() {
        assert_eq!(leb(0), vec![0x00]);
        assert_eq!(leb(127), vec![0x7f]);
        assert_eq!(leb(128), vec![0x80, 0x01]);
        assert_eq!(leb(300), vec![0xac, 0x02]);
    }

    #[test]
    fn str_roundtrip_multibyte() {
        let mut out = Vec::new();
        write_str(&mut out, "héllo wörld").unwrap();
        let mut r = ByteReader::new(&out);
        assert_eq!(r.str("s", 64).unwrap(), "héllo wörld");
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn str_rejects_overlong_prefix() {
        let bytes = [0xff; 11];
        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.str("s", MAX_STRING_LEN), Err(FormatError::BadLength));
    }

    #[test]
    fn str_respects_limit() {
        let mut out = Vec::new();
        write_str(&mut out, "abcdef").unwrap();
        let mut r = ByteReader::new(&out);
        assert_eq!(r.str("s", 4), Err(FormatError::BadLength));
    }
}

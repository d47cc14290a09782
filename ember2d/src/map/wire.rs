//! Primitive encoding for map files.
//!
//! All integers are little-endian and fixed width; sizes and indices are
//! `u64`, the player index is `i64`, floats are `f32`. Strings are UTF-8
//! followed by a single NUL byte.

use std::io::{self, ErrorKind, Read, Write};

use crate::error::MapError;

/// Upper bound for `Vec::with_capacity` on counts read from a file.
const MAX_PREALLOCATE: usize = 1024;

fn read_array<R: Read, const N: usize>(reader: &mut R, what: &'static str) -> Result<[u8; N], MapError> {
    let mut bytes = [0u8; N];
    match reader.read_exact(&mut bytes) {
        Ok(()) => Ok(bytes),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(MapError::Truncated(what)),
        Err(e) => Err(MapError::Io(e)),
    }
}

pub(crate) fn read_u64<R: Read>(reader: &mut R, what: &'static str) -> Result<u64, MapError> {
    Ok(u64::from_le_bytes(read_array(reader, what)?))
}

pub(crate) fn read_i64<R: Read>(reader: &mut R, what: &'static str) -> Result<i64, MapError> {
    Ok(i64::from_le_bytes(read_array(reader, what)?))
}

pub(crate) fn read_f32<R: Read>(reader: &mut R, what: &'static str) -> Result<f32, MapError> {
    Ok(f32::from_le_bytes(read_array(reader, what)?))
}

/// Read a section count and check it is addressable on this platform.
pub(crate) fn read_count<R: Read>(reader: &mut R, section: &'static str) -> Result<usize, MapError> {
    let count = read_u64(reader, section)?;
    usize::try_from(count).map_err(|_| MapError::CountTooLarge { section, count })
}

/// Capacity to reserve for `count` records without trusting the file blindly.
pub(crate) fn capacity_for(count: usize) -> usize {
    count.min(MAX_PREALLOCATE)
}

/// Read bytes up to (and consuming) the next NUL.
pub(crate) fn read_cstring<R: Read>(reader: &mut R, what: &'static str) -> Result<String, MapError> {
    let mut bytes = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) => return Err(MapError::UnterminatedString(what)),
            Ok(_) if byte[0] == 0 => break,
            Ok(_) => bytes.push(byte[0]),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(MapError::Io(e)),
        }
    }
    String::from_utf8(bytes).map_err(|_| MapError::InvalidUtf8(what))
}

pub(crate) fn write_u64<W: Write>(writer: &mut W, value: u64) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

pub(crate) fn write_i64<W: Write>(writer: &mut W, value: i64) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

pub(crate) fn write_f32<W: Write>(writer: &mut W, value: f32) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

pub(crate) fn write_count<W: Write>(writer: &mut W, count: usize) -> io::Result<()> {
    write_u64(writer, count as u64)
}

/// Check a string can be stored NUL-terminated.
pub(crate) fn check_cstring(value: &str, what: &'static str) -> Result<(), MapError> {
    if value.as_bytes().contains(&0) {
        return Err(MapError::InteriorNul(what));
    }
    Ok(())
}

pub(crate) fn write_cstring<W: Write>(writer: &mut W, value: &str, what: &'static str) -> Result<(), MapError> {
    check_cstring(value, what)?;
    writer.write_all(value.as_bytes())?;
    writer.write_all(&[0])?;
    Ok(())
}

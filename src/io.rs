//! Little-endian primitives shared by the file, metafile, and genotype
//! decoders. All multi-byte integers in BGEN and its sidecar index are
//! little-endian; strings are length-prefixed with a 1-, 2-, or 4-byte
//! prefix and carry no terminator.

use std::io::{Read, Write};

use crate::string::BgenString;

pub(crate) fn read_u8(reader: &mut impl Read) -> std::io::Result<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

pub(crate) fn read_u16(reader: &mut impl Read) -> std::io::Result<u16> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

pub(crate) fn read_u32(reader: &mut impl Read) -> std::io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub(crate) fn read_u64(reader: &mut impl Read) -> std::io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

pub(crate) fn write_u16(writer: &mut impl Write, value: u16) -> std::io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

pub(crate) fn write_u32(writer: &mut impl Write, value: u32) -> std::io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

pub(crate) fn write_u64(writer: &mut impl Write, value: u64) -> std::io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

/// Reads a length prefix of `prefix_len` bytes (1, 2, or 4) followed by that
/// many payload bytes. A zero-length payload is legal.
pub(crate) fn read_string(reader: &mut impl Read, prefix_len: usize) -> std::io::Result<BgenString> {
    debug_assert!(matches!(prefix_len, 1 | 2 | 4));
    let mut prefix = [0u8; 4];
    reader.read_exact(&mut prefix[..prefix_len])?;
    let len = u32::from_le_bytes(prefix) as usize;

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    Ok(BgenString::new(payload))
}

pub(crate) fn write_string(
    writer: &mut impl Write,
    string: &BgenString,
    prefix_len: usize,
) -> std::io::Result<()> {
    debug_assert!(matches!(prefix_len, 1 | 2 | 4));
    let prefix = (string.len() as u32).to_le_bytes();
    writer.write_all(&prefix[..prefix_len])?;
    writer.write_all(string.as_bytes())
}

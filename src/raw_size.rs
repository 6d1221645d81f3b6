//! Raw size packing for counts and lengths.
//!
//! A raw size is 1, 2, 4 or 8 little-endian bytes; the two low bits of the
//! first byte name the width and the remaining bits hold the value.

use crate::format::MAX_RAW_SIZE;
use crate::{Error, Result};

const MARKER_MASK: u8 = 0b11;

/// Number of bytes [`write_raw_size`] uses for `n`.
///
/// # Errors
///
/// Returns [`Error::SizeTooLarge`] if `n` exceeds 2^62 - 1.
#[inline]
pub fn encoded_len(n: u64) -> Result<usize> {
    match n {
        0..=0x3f => Ok(1),
        0x40..=0x3fff => Ok(2),
        0x4000..=0x3fff_ffff => Ok(4),
        0x4000_0000..=MAX_RAW_SIZE => Ok(8),
        _ => Err(Error::SizeTooLarge(n)),
    }
}

/// Appends the raw size encoding of `n` to `out`.
///
/// # Examples
///
/// ```rust
/// use portable_storage::raw_size::write_raw_size;
///
/// let mut out = Vec::new();
/// write_raw_size(&mut out, 1).unwrap();
/// write_raw_size(&mut out, 300).unwrap();
/// assert_eq!(out, [0x04, 0xb1, 0x04]);
/// ```
///
/// # Errors
///
/// Returns [`Error::SizeTooLarge`] if `n` exceeds 2^62 - 1.
pub fn write_raw_size(out: &mut Vec<u8>, n: u64) -> Result<()> {
    let width = encoded_len(n)?;
    let marker = width.trailing_zeros() as u64;
    let packed = (n << 2) | marker;
    out.extend_from_slice(&packed.to_le_bytes()[..width]);
    Ok(())
}

/// Decodes a raw size from the front of `input`.
///
/// Returns the value and the number of bytes consumed.
///
/// # Examples
///
/// ```rust
/// use portable_storage::raw_size::read_raw_size;
///
/// assert_eq!(read_raw_size(&[0x08]).unwrap(), (2, 1));
/// assert_eq!(read_raw_size(&[0xb1, 0x04]).unwrap(), (300, 2));
/// assert!(read_raw_size(&[0x01]).is_err());
/// ```
///
/// # Errors
///
/// Returns [`Error::Truncated`] if `input` holds fewer bytes than the width
/// marker demands. Offsets in the error are relative to `input`.
pub fn read_raw_size(input: &[u8]) -> Result<(u64, usize)> {
    let first = *input.first().ok_or_else(|| Error::truncated(0, 1, 0))?;
    let width = 1usize << (first & MARKER_MASK);
    let bytes = input
        .get(..width)
        .ok_or_else(|| Error::truncated(0, width, input.len()))?;

    let mut buf = [0u8; 8];
    buf[..width].copy_from_slice(bytes);
    Ok((u64::from_le_bytes(buf) >> 2, width))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(n: u64) -> Vec<u8> {
        let mut out = Vec::new();
        write_raw_size(&mut out, n).unwrap();
        out
    }

    #[test]
    fn test_width_boundaries() {
        assert_eq!(encode(0), [0x00]);
        assert_eq!(encode(63), [0xfc]);
        assert_eq!(encode(64), [0x01, 0x01]);
        assert_eq!(encode(16383), [0xfd, 0xff]);
        assert_eq!(encode(16384), [0x02, 0x00, 0x01, 0x00]);
        assert_eq!(encode(0x3fff_ffff), [0xfe, 0xff, 0xff, 0xff]);
        assert_eq!(encode(0x4000_0000).len(), 8);
        assert_eq!(encode(MAX_RAW_SIZE), [0xff; 8]);
    }

    #[test]
    fn test_decode_boundaries() {
        for n in [0, 1, 63, 64, 16383, 16384, 0x3fff_ffff, 0x4000_0000, MAX_RAW_SIZE] {
            let bytes = encode(n);
            assert_eq!(read_raw_size(&bytes).unwrap(), (n, bytes.len()));
        }
    }

    #[test]
    fn test_too_large() {
        let mut out = Vec::new();
        assert_eq!(
            write_raw_size(&mut out, MAX_RAW_SIZE + 1),
            Err(Error::SizeTooLarge(MAX_RAW_SIZE + 1))
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_truncated() {
        assert_eq!(read_raw_size(&[]), Err(Error::truncated(0, 1, 0)));
        // marker 2 wants four bytes
        assert_eq!(
            read_raw_size(&[0x02, 0x00]),
            Err(Error::truncated(0, 4, 2))
        );
        assert_eq!(
            read_raw_size(&[0x03, 0, 0, 0, 0, 0, 0]),
            Err(Error::truncated(0, 8, 7))
        );
    }

    #[test]
    fn test_ignores_following_bytes() {
        assert_eq!(read_raw_size(&[0x04, 0xff, 0xff]).unwrap(), (1, 1));
    }
}

//! Byte-level decoding of the Avro primitives
//!
//! Varint decoding is implemented by hand rather than through
//! `integer-encoding` because the error contract matters here: a varint that
//! runs over its maximum width (6th continuation byte for an `int`, 11th for
//! a `long`) or whose decoded magnitude does not fit the target type must
//! fail with [`MalformedVarint`](ErrorKind::MalformedVarint) without
//! consuming any further input, and end-of-input mid-item must fail with
//! [`UnexpectedEnd`](ErrorKind::UnexpectedEnd).

use crate::error::{Error, ErrorKind};

use std::io::Read;

pub(crate) fn read_u8<R: Read>(reader: &mut R) -> Result<u8, Error> {
	let mut buf = [0u8; 1];
	reader.read_exact(&mut buf).map_err(Error::io)?;
	Ok(buf[0])
}

pub(crate) fn read_const_size_buf<R: Read, const N: usize>(
	reader: &mut R,
) -> Result<[u8; N], Error> {
	let mut buf = [0u8; N];
	reader.read_exact(&mut buf).map_err(Error::io)?;
	Ok(buf)
}

pub(crate) fn read_vec<R: Read>(reader: &mut R, len: usize) -> Result<Vec<u8>, Error> {
	let mut buf = vec![0u8; len];
	reader.read_exact(&mut buf).map_err(Error::io)?;
	Ok(buf)
}

fn read_varint<R: Read>(reader: &mut R, max_bytes: u32, width: u32) -> Result<u64, Error> {
	let mut acc: u64 = 0;
	for i in 0..max_bytes {
		let byte = read_u8(reader)?;
		let bits = u64::from(byte & 0x7F);
		let shift = 7 * i;
		if (bits << shift) >> shift != bits {
			return Err(Error::msg(
				ErrorKind::MalformedVarint,
				format_args!("Varint magnitude does not fit in {width} bits"),
			));
		}
		acc |= bits << shift;
		if byte & 0x80 == 0 {
			if width < u64::BITS && acc >> width != 0 {
				return Err(Error::msg(
					ErrorKind::MalformedVarint,
					format_args!("Varint magnitude does not fit in {width} bits"),
				));
			}
			return Ok(acc);
		}
	}
	Err(Error::msg(
		ErrorKind::MalformedVarint,
		format_args!("Varint runs over its maximum width of {max_bytes} bytes"),
	))
}

fn zigzag(encoded: u64) -> i64 {
	((encoded >> 1) as i64) ^ -((encoded & 1) as i64)
}

pub(crate) fn read_long<R: Read>(reader: &mut R) -> Result<i64, Error> {
	read_varint(reader, 10, 64).map(zigzag)
}

pub(crate) fn read_int<R: Read>(reader: &mut R) -> Result<i32, Error> {
	read_varint(reader, 5, 32).map(|encoded| zigzag(encoded) as i32)
}

/// A long used as a length prefix: negative or implausibly large is malformed
pub(crate) fn read_len<R: Read>(reader: &mut R) -> Result<usize, Error> {
	let len = read_long(reader)?;
	if len < 0 || len > i32::MAX as i64 {
		return Err(Error::msg(
			ErrorKind::MalformedLength,
			format_args!("Invalid length prefix: {len}"),
		));
	}
	Ok(len as usize)
}

pub(crate) fn read_bool<R: Read>(reader: &mut R) -> Result<bool, Error> {
	match read_u8(reader)? {
		0 => Ok(false),
		1 => Ok(true),
		other => Err(Error::msg(
			ErrorKind::InvalidData,
			format_args!("Invalid boolean byte: {other:#04x}"),
		)),
	}
}

pub(crate) fn read_float<R: Read>(reader: &mut R) -> Result<f32, Error> {
	read_const_size_buf(reader).map(f32::from_le_bytes)
}

pub(crate) fn read_double<R: Read>(reader: &mut R) -> Result<f64, Error> {
	read_const_size_buf(reader).map(f64::from_le_bytes)
}

pub(crate) fn read_string<R: Read>(reader: &mut R) -> Result<String, Error> {
	let len = read_len(reader)?;
	String::from_utf8(read_vec(reader, len)?)
		.map_err(|e| Error::msg(ErrorKind::InvalidData, format_args!("Invalid UTF-8: {e}")))
}

pub(crate) fn skip_bytes<R: Read>(reader: &mut R, n: u64) -> Result<(), Error> {
	let skipped =
		std::io::copy(&mut reader.take(n), &mut std::io::sink()).map_err(Error::io)?;
	if skipped != n {
		return Err(Error::new(
			ErrorKind::UnexpectedEnd,
			"Unexpected end of input in the middle of an item",
		));
	}
	Ok(())
}

/// The count prefix of an array/map block: a negative count `-n` means `n`
/// items follow, preceded by the byte length of the block for skip support
pub(crate) fn read_block_header<R: Read>(
	reader: &mut R,
) -> Result<(usize, Option<u64>), Error> {
	let count = read_long(reader)?;
	if count >= 0 {
		Ok((count as usize, None))
	} else {
		let count = count.checked_neg().ok_or_else(|| {
			Error::new(ErrorKind::MalformedLength, "Invalid block item count")
		})?;
		let byte_len = read_long(reader)?;
		if byte_len < 0 {
			return Err(Error::msg(
				ErrorKind::MalformedLength,
				format_args!("Invalid block byte length: {byte_len}"),
			));
		}
		Ok((count as usize, Some(byte_len as u64)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	use pretty_assertions::assert_eq;

	#[track_caller]
	fn long_of(bytes: &[u8]) -> i64 {
		read_long(&mut &*bytes).unwrap()
	}

	#[test]
	fn zigzag_varints() {
		assert_eq!(long_of(&[0x00]), 0);
		assert_eq!(long_of(&[0x01]), -1);
		assert_eq!(long_of(&[0x02]), 1);
		assert_eq!(long_of(&[0x7E]), 63);
		assert_eq!(long_of(&[0x80, 0x01]), 64);
		assert_eq!(long_of(&[0x7F]), -64);
		assert_eq!(long_of(&[0x81, 0x01]), -65);
	}

	#[test]
	fn int_rejects_sixth_byte() {
		// Five continuation bytes mean a sixth byte would be needed: the
		// decoder must fail without consuming it
		let bytes: &[u8] = &[0x80, 0x80, 0x80, 0x80, 0x80, 0x00];
		let mut reader = bytes;
		let err = read_int(&mut reader).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::MalformedVarint);
		assert_eq!(reader.len(), 1);
	}

	#[test]
	fn int_rejects_over_32_bits_of_magnitude() {
		// 5 bytes whose last carries bits beyond the 32nd
		let err = read_int(&mut &[0x80u8, 0x80, 0x80, 0x80, 0x7F][..]).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::MalformedVarint);
	}

	#[test]
	fn long_rejects_eleventh_byte() {
		let bytes: &[u8] = &[
			0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x00,
		];
		let mut reader = bytes;
		let err = read_long(&mut reader).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::MalformedVarint);
		assert_eq!(reader.len(), 1);
	}

	#[test]
	fn long_extremes_round_trip() {
		for value in [i64::MIN, i64::MAX, 0, -1] {
			let mut buf = Vec::new();
			crate::ser::write::write_long(&mut buf, value).unwrap();
			assert_eq!(long_of(&buf), value);
		}
	}

	#[test]
	fn eof_mid_varint() {
		let err = read_long(&mut &[0x80u8][..]).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::UnexpectedEnd);
	}
}

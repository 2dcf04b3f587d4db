//! Byte-level encoding of the Avro primitives
//!
//! Integers are zig-zag variable-length encoded (the `integer-encoding`
//! implementations of [`VarInt`] for `i32`/`i64` are exactly Avro's wire
//! format), floats are little-endian IEEE-754, bytes and strings are
//! length-prefixed.

use crate::error::{Error, ErrorKind};

use {integer_encoding::VarInt, std::io::Write};

pub(crate) fn write_bool<W: Write>(out: &mut W, value: bool) -> Result<(), Error> {
	out.write_all(&[value as u8]).map_err(Error::io)
}

pub(crate) fn write_int<W: Write>(out: &mut W, value: i32) -> Result<(), Error> {
	let mut buf = [0u8; 5];
	let n = value.encode_var(&mut buf);
	out.write_all(&buf[..n]).map_err(Error::io)
}

pub(crate) fn write_long<W: Write>(out: &mut W, value: i64) -> Result<(), Error> {
	let mut buf = [0u8; 10];
	let n = value.encode_var(&mut buf);
	out.write_all(&buf[..n]).map_err(Error::io)
}

pub(crate) fn write_len<W: Write>(out: &mut W, len: usize) -> Result<(), Error> {
	let len: i64 = len.try_into().map_err(|_| {
		Error::new(
			ErrorKind::MalformedLength,
			"Length does not fit in a long length prefix",
		)
	})?;
	write_long(out, len)
}

pub(crate) fn write_float<W: Write>(out: &mut W, value: f32) -> Result<(), Error> {
	out.write_all(&value.to_le_bytes()).map_err(Error::io)
}

pub(crate) fn write_double<W: Write>(out: &mut W, value: f64) -> Result<(), Error> {
	out.write_all(&value.to_le_bytes()).map_err(Error::io)
}

pub(crate) fn write_bytes<W: Write>(out: &mut W, bytes: &[u8]) -> Result<(), Error> {
	write_len(out, bytes.len())?;
	out.write_all(bytes).map_err(Error::io)
}

pub(crate) fn write_str<W: Write>(out: &mut W, s: &str) -> Result<(), Error> {
	write_bytes(out, s.as_bytes())
}

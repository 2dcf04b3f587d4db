//! Support for [object container files](https://avro.apache.org/docs/current/specification/#object-container-files)
//!
//! This is typically what you want when reading/writing avro files with
//! multiple objects.
//!
//! See [`Reader`] and [`Writer`] documentations for their respective
//! examples.

mod reader;
mod writer;

pub use {reader::*, writer::*};

use crate::error::{Error, ErrorKind};

use std::num::NonZeroU8;

pub(crate) const HEADER_CONST: [u8; 4] = [b'O', b'b', b'j', 1u8];

pub(crate) const SCHEMA_METADATA_KEY: &str = "avro.schema";
pub(crate) const CODEC_METADATA_KEY: &str = "avro.codec";

/// Specifies the compression codec (and level, where applicable) to be used
/// for the data blocks in the file
///
/// Variants may be made available by enabling features.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Compression {
	/// The `null` codec simply passes through data uncompressed.
	Null,
	#[cfg(feature = "deflate")]
	/// The `deflate` codec writes the data block using the deflate algorithm
	/// as specified in RFC 1951. Note that this format (unlike the "zlib
	/// format" in RFC 1950) does not have a checksum.
	Deflate {
		/// Deflate compression level to use (1-9 or
		/// [`CompressionLevel::default()`])
		level: CompressionLevel,
	},
	#[cfg(feature = "snappy")]
	/// The `snappy` codec uses Google's [Snappy](https://google.github.io/snappy/)
	/// compression algorithm. Each compressed block is followed by the
	/// 4-byte, big-endian CRC32 checksum of the uncompressed data in the
	/// block.
	Snappy,
}

impl Compression {
	/// The name of the codec, as stored under `avro.codec` in the file
	/// header
	pub fn name(self) -> &'static str {
		match self {
			Compression::Null => "null",
			#[cfg(feature = "deflate")]
			Compression::Deflate { .. } => "deflate",
			#[cfg(feature = "snappy")]
			Compression::Snappy => "snappy",
		}
	}

	/// Look a codec up by its `avro.codec` name
	pub(crate) fn from_name(name: &str) -> Result<Self, Error> {
		match name {
			"null" => Ok(Compression::Null),
			#[cfg(feature = "deflate")]
			"deflate" => Ok(Compression::Deflate {
				level: CompressionLevel::default(),
			}),
			#[cfg(feature = "snappy")]
			"snappy" => Ok(Compression::Snappy),
			#[cfg(not(feature = "deflate"))]
			"deflate" => Err(Error::new(
				ErrorKind::UnsupportedCodec,
				"File uses the deflate codec but the `deflate` feature is not enabled",
			)),
			#[cfg(not(feature = "snappy"))]
			"snappy" => Err(Error::new(
				ErrorKind::UnsupportedCodec,
				"File uses the snappy codec but the `snappy` feature is not enabled",
			)),
			unknown => Err(Error::msg(
				ErrorKind::UnsupportedCodec,
				format_args!("Unknown compression codec: {unknown:?}"),
			)),
		}
	}
}

/// Compression level to use for the compression algorithm
///
/// You may either specify a given number (1-9) or use the default
/// compression level.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompressionLevel {
	repr: NonZeroU8,
}

impl CompressionLevel {
	/// Specifies the compression level that will be used for the compression
	/// algorithm
	///
	/// `level` gets clipped into the appropriate range for the algorithm
	/// (e.g. set to `9` if higher than `9`).
	///
	/// # Panics
	/// If `level` is lower than `1`
	pub const fn new(mut level: u8) -> Self {
		if level == u8::MAX {
			level -= 1;
		}
		match NonZeroU8::new(level) {
			Some(n) => Self { repr: n },
			None => panic!("Compression level must be greater than 0"),
		}
	}

	/// Use the default compression level of the considered algorithm
	pub const fn default() -> Self {
		Self {
			repr: match NonZeroU8::new(u8::MAX) {
				Some(nonzero) => nonzero,
				None => unreachable!(),
			},
		}
	}

	#[allow(unused)]
	/// may be unused depending on which compression codecs features are enabled
	fn clip(mut self, high: u8) -> Self {
		if self.repr.get() != u8::MAX {
			self.repr = self.repr.min(NonZeroU8::new(high).expect(
				"Highest compression level for \
					algorithm should be greater than zero",
			))
		}
		self
	}

	#[allow(unused)]
	/// may be unused depending on which compression codecs features are enabled
	fn instantiate<T: Default, C: From<u8>, F: FnOnce(C) -> T>(self, f: F) -> T {
		match self.repr.get() {
			u8::MAX => T::default(),
			specified_compression_level => f(specified_compression_level.into()),
		}
	}
}

impl Default for CompressionLevel {
	fn default() -> Self {
		CompressionLevel::default()
	}
}

impl std::fmt::Debug for CompressionLevel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self.repr.get() {
			u8::MAX => write!(f, "Default"),
			_ => write!(f, "{}", self.repr),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn codec_names_round_trip() {
		assert_eq!(Compression::from_name("null").unwrap(), Compression::Null);
		#[cfg(feature = "deflate")]
		assert_eq!(
			Compression::from_name("deflate").unwrap().name(),
			"deflate"
		);
		#[cfg(feature = "snappy")]
		assert_eq!(Compression::from_name("snappy").unwrap(), Compression::Snappy);
		assert_eq!(
			Compression::from_name("lzma").unwrap_err().kind(),
			crate::error::ErrorKind::UnsupportedCodec
		);
	}
}

use crate::{
	error::{Error, ErrorKind},
	object_container_file_encoding::Compression,
};

/// Per-writer compression state: the codec choice plus reusable buffers, so
/// that compressing one block does not allocate when the previous block's
/// buffers suffice
pub(super) struct CompressionCodecState {
	output_vec: Vec<u8>,
	kind: Kind,
}

enum Kind {
	Null,
	#[cfg(feature = "deflate")]
	Deflate {
		level: crate::object_container_file_encoding::CompressionLevel,
	},
	#[cfg(feature = "snappy")]
	Snappy {
		encoder: snap::raw::Encoder,
	},
}

impl CompressionCodecState {
	pub(super) fn new(compression: Compression) -> Self {
		Self {
			output_vec: Vec::new(),
			kind: match compression {
				Compression::Null => Kind::Null,
				#[cfg(feature = "deflate")]
				Compression::Deflate { level } => Kind::Deflate {
					level: level.clip(9),
				},
				#[cfg(feature = "snappy")]
				Compression::Snappy => Kind::Snappy {
					encoder: snap::raw::Encoder::new(),
				},
			},
		}
	}

	/// If none, the codec is `null` and the input buffer should be used
	/// as-is
	pub(super) fn compressed_buffer(&self) -> Option<&[u8]> {
		match self.kind {
			Kind::Null => None,
			#[cfg(feature = "deflate")]
			Kind::Deflate { .. } => Some(&self.output_vec),
			#[cfg(feature = "snappy")]
			Kind::Snappy { .. } => Some(&self.output_vec),
		}
	}

	pub(super) fn encode(&mut self, input: &[u8]) -> Result<(), Error> {
		match &mut self.kind {
			Kind::Null => {}
			#[cfg(feature = "deflate")]
			Kind::Deflate { level } => {
				use std::io::Write;
				self.output_vec.clear();
				let mut encoder = flate2::write::DeflateEncoder::new(
					std::mem::take(&mut self.output_vec),
					level.instantiate(flate2::Compression::new),
				);
				let result = encoder
					.write_all(input)
					.and_then(|()| encoder.finish());
				match result {
					Ok(output_vec) => self.output_vec = output_vec,
					Err(deflate_error) => {
						return Err(Error::msg(
							ErrorKind::CodecCorrupt,
							format_args!("Deflate compression error: {deflate_error}"),
						))
					}
				}
			}
			#[cfg(feature = "snappy")]
			Kind::Snappy { encoder } => {
				self.output_vec
					.resize(snap::raw::max_compress_len(input.len()), 0);
				let n = encoder
					.compress(input, &mut self.output_vec)
					.map_err(|snappy_error| {
						Error::msg(
							ErrorKind::CodecCorrupt,
							format_args!("Snappy compression error: {snappy_error}"),
						)
					})?;
				self.output_vec.truncate(n);
				// Avro appends the big-endian CRC32 of the uncompressed
				// block after the snappy data
				self.output_vec.extend(crc32fast::hash(input).to_be_bytes());
			}
		}
		Ok(())
	}
}

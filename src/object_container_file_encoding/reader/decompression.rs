use crate::{
	error::{Error, ErrorKind},
	object_container_file_encoding::Compression,
};

/// Decompress one block's payload into `output`
///
/// For the `null` codec the payload is moved, not copied.
pub(super) fn decompress_block(
	compression: Compression,
	compressed: Vec<u8>,
	output: &mut Vec<u8>,
) -> Result<(), Error> {
	match compression {
		Compression::Null => {
			*output = compressed;
			Ok(())
		}
		#[cfg(feature = "deflate")]
		Compression::Deflate { .. } => {
			use std::io::Read;
			output.clear();
			flate2::bufread::DeflateDecoder::new(compressed.as_slice())
				.read_to_end(output)
				.map_err(|deflate_error| {
					Error::msg(
						ErrorKind::CodecCorrupt,
						format_args!("Deflate decompression error: {deflate_error}"),
					)
				})?;
			Ok(())
		}
		#[cfg(feature = "snappy")]
		Compression::Snappy => {
			// The last 4 bytes of the block are the big-endian CRC32 of the
			// uncompressed data
			let crc_split = compressed.len().checked_sub(4).ok_or_else(|| {
				Error::new(
					ErrorKind::CodecCorrupt,
					"Snappy block too short to hold its CRC32",
				)
			})?;
			let (compressed, crc_bytes) = compressed.split_at(crc_split);
			let snappy_error = |snappy_error: snap::Error| {
				Error::msg(
					ErrorKind::CodecCorrupt,
					format_args!("Snappy decompression error: {snappy_error}"),
				)
			};
			output.resize(
				snap::raw::decompress_len(compressed).map_err(snappy_error)?,
				0,
			);
			let written = snap::raw::Decoder::new()
				.decompress(compressed, output)
				.map_err(snappy_error)?;
			if written != output.len() {
				return Err(Error::new(
					ErrorKind::CodecCorrupt,
					"Snappy decompression error: incorrect decompressed size",
				));
			}
			let expected_crc32 = u32::from_be_bytes(crc_bytes.try_into().expect("4 bytes"));
			if crc32fast::hash(output) != expected_crc32 {
				return Err(Error::new(
					ErrorKind::CodecCorrupt,
					"Incorrect CRC32 of decompressed data in Snappy-compressed block",
				));
			}
			Ok(())
		}
	}
}

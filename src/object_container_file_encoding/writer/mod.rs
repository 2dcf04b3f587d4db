mod compression;

use compression::CompressionCodecState;

use crate::{
	error::{Error, ErrorKind},
	object_container_file_encoding::{
		Compression, CODEC_METADATA_KEY, HEADER_CONST, SCHEMA_METADATA_KEY,
	},
	ser,
	value::Value,
	Schema,
};

use {
	integer_encoding::VarInt,
	std::{collections::BTreeMap, io::Write},
};

/// Default soft threshold on the uncompressed block size, 16 KiB
const DEFAULT_SYNC_INTERVAL: usize = 16 * 1024;

/// [`Writer`] builder for [object container files](https://avro.apache.org/docs/current/specification/#object-container-files)
///
/// See [`Writer`] for an example.
pub struct WriterBuilder<'s> {
	schema: &'s Schema,
	compression: Compression,
	sync_interval: usize,
	metadata: BTreeMap<String, Vec<u8>>,
	/// Will otherwise be randomly generated
	enforce_sync_marker_value: Option<[u8; 16]>,
}

impl<'s> WriterBuilder<'s> {
	/// Construct a writer builder for the given schema
	pub fn new(schema: &'s Schema) -> Self {
		Self {
			schema,
			compression: Compression::Null,
			sync_interval: DEFAULT_SYNC_INTERVAL,
			metadata: BTreeMap::new(),
			enforce_sync_marker_value: None,
		}
	}

	/// Specify the compression codec that each block will be compressed with
	pub fn compression(mut self, compression: Compression) -> Self {
		self.compression = compression;
		self
	}

	/// Soft threshold on the uncompressed block size in bytes
	///
	/// Once a datum brings the block buffer over this size, the block is
	/// compressed and flushed. The datum being appended is always finished
	/// first, so blocks may overshoot this by one datum.
	///
	/// Default value is 16 KiB.
	pub fn sync_interval(mut self, sync_interval: usize) -> Self {
		self.sync_interval = sync_interval.max(1);
		self
	}

	/// Add an application metadata entry to be stored in the file header
	///
	/// Keys starting with `avro.` are reserved; `avro.schema` and
	/// `avro.codec` are always written by the writer itself and cannot be
	/// overridden.
	pub fn metadata(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
		self.metadata.insert(key.into(), value.into());
		self
	}

	/// Enforce the 16-byte inter-block sync marker value
	///
	/// If not set, a random value will be generated once per file.
	///
	/// Setting this may be useful for reproducibility (e.g. tests) or if
	/// generating a file by concatenating independently generated batches
	/// (the sync markers would need to be the same, otherwise the resulting
	/// file would be incorrect).
	pub fn sync_marker(mut self, sync_marker: [u8; 16]) -> Self {
		self.enforce_sync_marker_value = Some(sync_marker);
		self
	}

	/// Build the [`Writer`] over the provided sink
	///
	/// Nothing is written until the first [`append`](Writer::append) (or
	/// [`close`](Writer::close), which writes the header even for an empty
	/// file).
	pub fn build<W: Write>(self, sink: W) -> Writer<'s, W> {
		let sync_marker = match self.enforce_sync_marker_value {
			Some(enforced_sync_marker) => enforced_sync_marker,
			None => {
				let mut random_sync_marker = [0; 16];
				rand::Rng::fill(&mut rand::thread_rng(), &mut random_sync_marker);
				random_sync_marker
			}
		};
		Writer {
			schema: self.schema,
			sink: Some(sink),
			state: State::Fresh,
			block_buffer: Vec::with_capacity(self.sync_interval * 5 / 4),
			datums_in_block: 0,
			sync_interval: self.sync_interval,
			sync_marker,
			compression_codec_state: CompressionCodecState::new(self.compression),
			compression: self.compression,
			metadata: self.metadata,
			position: 0,
		}
	}
}

#[derive(Clone, Copy, PartialEq)]
enum State {
	/// Nothing written yet, not even the header
	Fresh,
	/// Header written, appends accepted
	Open,
	/// `close` was called; the sink holds a complete container file
	Closed,
}

/// Writer for [object container files](https://avro.apache.org/docs/current/specification/#object-container-files)
///
/// To be constructed via [`WriterBuilder`].
///
/// # Example
/// ```
/// use avro_container::{
/// 	object_container_file_encoding::{Reader, WriterBuilder},
/// 	Value,
/// };
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let schema: avro_container::Schema = r#""long""#.parse()?;
///
/// let mut writer = WriterBuilder::new(&schema).build(Vec::new());
/// for i in 0..3i64 {
/// 	writer.append(&Value::Long(i))?;
/// }
/// let encoded: Vec<u8> = writer.into_inner()?;
///
/// let decoded = Reader::from_slice(&encoded)?.collect::<Result<Vec<Value>, _>>()?;
/// assert_eq!(
/// 	decoded,
/// 	&[Value::Long(0), Value::Long(1), Value::Long(2)]
/// );
/// # Ok(())
/// # }
/// ```
pub struct Writer<'s, W: Write> {
	schema: &'s Schema,
	sink: Option<W>,
	state: State,
	/// Uncompressed datums accumulated for the current block
	block_buffer: Vec<u8>,
	datums_in_block: u64,
	sync_interval: usize,
	sync_marker: [u8; 16],
	compression: Compression,
	metadata: BTreeMap<String, Vec<u8>>,
	/// Bytes written to the sink so far
	position: u64,
	/// This type goes at the end because it's potentially large
	compression_codec_state: CompressionCodecState,
}

impl<'s, W: Write> Writer<'s, W> {
	/// Encode one value into the current block
	///
	/// The header is written lazily on the first append. If the block buffer
	/// crosses the configured sync interval, the block is compressed and
	/// flushed to the sink.
	///
	/// An append that fails because the value does not match the schema
	/// leaves the writer intact: already-buffered datums and already-flushed
	/// blocks are unaffected.
	pub fn append(&mut self, value: &Value) -> Result<(), Error> {
		self.ensure_open()?;
		let buffered_before_attempt = self.block_buffer.len();
		ser::encode_value(self.schema, self.schema.root_key(), value, &mut self.block_buffer)
			.map_err(|e| {
				// Discard the partial datum
				self.block_buffer.truncate(buffered_before_attempt);
				e
			})?;
		self.datums_in_block += 1;
		if self.block_buffer.len() >= self.sync_interval {
			self.flush_block()?;
		}
		Ok(())
	}

	/// Append every value of the provided sequence
	pub fn append_all<'v>(
		&mut self,
		values: impl IntoIterator<Item = &'v Value>,
	) -> Result<(), Error> {
		values.into_iter().try_for_each(|value| self.append(value))
	}

	/// Flush the current block (if any datums are buffered) and return the
	/// byte position in the container file
	///
	/// After this returns, everything written so far amounts to a valid
	/// container file, and the returned position is a block boundary.
	pub fn sync(&mut self) -> Result<u64, Error> {
		self.ensure_open()?;
		self.flush_block()?;
		Ok(self.position)
	}

	/// Flush any pending block and release the sink
	///
	/// Idempotent: closing an already-closed writer does nothing. The header
	/// is written even if nothing was ever appended, so an empty container
	/// file is still a valid one. Appending after close fails with
	/// [`WriterClosed`](ErrorKind::WriterClosed).
	pub fn close(&mut self) -> Result<(), Error> {
		match self.state {
			State::Closed => Ok(()),
			State::Fresh | State::Open => {
				self.ensure_open()?;
				self.flush_block()?;
				if let Some(sink) = self.sink.as_mut() {
					sink.flush().map_err(Error::io)?;
				}
				self.state = State::Closed;
				Ok(())
			}
		}
	}

	/// Close the writer and return the sink
	pub fn into_inner(mut self) -> Result<W, Error> {
		self.close()?;
		Ok(self
			.sink
			.take()
			.expect("Sink is only taken by into_inner, which takes ownership"))
	}

	/// The schema this writer encodes with
	pub fn schema(&self) -> &'s Schema {
		self.schema
	}

	/// Write the header if this writer is fresh, fail if it is closed
	fn ensure_open(&mut self) -> Result<(), Error> {
		match self.state {
			State::Open => Ok(()),
			State::Closed => Err(Error::new(
				ErrorKind::WriterClosed,
				"Writer was already closed",
			)),
			State::Fresh => {
				let mut header = Vec::new();
				header.extend_from_slice(&HEADER_CONST);

				// The header metadata is an avro map<bytes>; the two
				// reserved entries always reflect the writer's own schema
				// and codec
				let mut metadata = std::mem::take(&mut self.metadata);
				metadata.insert(
					SCHEMA_METADATA_KEY.to_owned(),
					self.schema.json().into_bytes(),
				);
				metadata.insert(
					CODEC_METADATA_KEY.to_owned(),
					self.compression.name().as_bytes().to_vec(),
				);
				ser::write::write_len(&mut header, metadata.len())?;
				for (key, meta_value) in &metadata {
					ser::write::write_str(&mut header, key)?;
					ser::write::write_bytes(&mut header, meta_value)?;
				}
				ser::write::write_long(&mut header, 0)?;

				header.extend_from_slice(&self.sync_marker);

				let sink = self
					.sink
					.as_mut()
					.expect("Sink is present until into_inner");
				sink.write_all(&header).map_err(Error::io)?;
				self.position += header.len() as u64;
				self.state = State::Open;
				Ok(())
			}
		}
	}

	/// Compress and emit the current block: `<count><byte length><data><sync>`
	///
	/// A flush with no buffered datums is a no-op.
	fn flush_block(&mut self) -> Result<(), Error> {
		if self.datums_in_block == 0 {
			return Ok(());
		}

		self.compression_codec_state.encode(&self.block_buffer)?;
		let compressed = self
			.compression_codec_state
			.compressed_buffer()
			.unwrap_or(&self.block_buffer);

		let mut block_header_buffer = [0u8; 20];
		let n = (self.datums_in_block as i64).encode_var(&mut block_header_buffer);
		let n2 = (compressed.len() as i64).encode_var(&mut block_header_buffer[n..]);

		let sink = self
			.sink
			.as_mut()
			.expect("Sink is present until into_inner");
		sink.write_all(&block_header_buffer[..n + n2])
			.map_err(Error::io)?;
		sink.write_all(compressed).map_err(Error::io)?;
		sink.write_all(&self.sync_marker).map_err(Error::io)?;
		self.position += (n + n2 + compressed.len() + self.sync_marker.len()) as u64;

		self.block_buffer.clear();
		self.datums_in_block = 0;
		Ok(())
	}
}

impl<'s, W: Write> Drop for Writer<'s, W> {
	fn drop(&mut self) {
		if self.sink.is_none() || self.state == State::Closed {
			return;
		}
		let panicking = std::thread::panicking();
		let res = match panicking {
			false => self.close(),
			true => {
				// We are already panicking so even if close panics we just
				// want to let the current panic propagate
				std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| self.close()))
					.unwrap_or(Ok(()))
			}
		};
		if cfg!(debug_assertions) && !panicking {
			res.expect(
				"Failed to flush Writer on Drop. \
					Please favor closing manually before dropping the Writer.",
			);
		}
	}
}

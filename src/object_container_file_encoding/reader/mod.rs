mod decompression;

use crate::{
	de::{self, read, ReadPlan},
	error::{Error, ErrorKind},
	object_container_file_encoding::{
		Compression, CODEC_METADATA_KEY, HEADER_CONST, SCHEMA_METADATA_KEY,
	},
	value::Value,
	Schema,
};

use std::{
	collections::HashMap,
	io::{BufRead, Cursor},
};

/// Reader for [object container files](https://avro.apache.org/docs/current/specification/#object-container-files)
///
/// The writer schema is parsed from the file header; a different reader
/// schema may be supplied through [`ReaderBuilder`], in which case Avro
/// schema resolution applies to every decoded datum.
///
/// # Example
/// ```
/// use avro_container::{object_container_file_encoding::Reader, Value};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let encoded: &[u8] = &[
/// 	79, 98, 106, 1, 4, 20, 97, 118, 114, 111, 46, 99, 111, 100, 101, 99, 8, 110, 117, 108,
/// 	108, 22, 97, 118, 114, 111, 46, 115, 99, 104, 101, 109, 97, 12, 34, 108, 111, 110, 103,
/// 	34, 0, 94, 61, 54, 221, 190, 207, 108, 180, 158, 57, 114, 40, 173, 199, 228, 239, 4, 4,
/// 	54, 84, 94, 61, 54, 221, 190, 207, 108, 180, 158, 57, 114, 40, 173, 199, 228, 239,
/// ];
///
/// let mut reader = Reader::from_slice(encoded)?;
/// assert_eq!(
/// 	reader.by_ref().collect::<Result<Vec<Value>, _>>()?,
/// 	&[Value::Long(27), Value::Long(42)]
/// );
/// assert_eq!(reader.meta("avro.codec"), Some(&b"null"[..]));
/// # Ok(())
/// # }
/// ```
///
/// Works from either slices or arbitrary `impl BufRead`s. If you only have
/// an `impl Read`, wrap it in a [`BufReader`](std::io::BufReader) first.
#[derive(Debug)]
pub struct Reader<R> {
	source: R,
	schema: Schema,
	plan: ReadPlan,
	compression: Compression,
	metadata: HashMap<String, Vec<u8>>,
	sync_marker: [u8; 16],
	/// Decompressed payload of the current block, replaced on advance
	block: Cursor<Vec<u8>>,
	/// Items remaining in the current block
	remaining: u64,
	/// Once a decode or framing error was yielded the stream is final:
	/// iteration pretends EOF afterwards
	errored: bool,
}

/// [`Reader`] builder, for when the defaults need adjusting (reader schema)
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// # let file: &[u8] = &[];
/// let reader_schema: avro_container::Schema = r#""double""#.parse()?;
/// let reader = avro_container::object_container_file_encoding::ReaderBuilder::new()
/// 	.reader_schema(&reader_schema)
/// 	.from_slice(file)?;
/// # Ok(())
/// # }
/// ```
pub struct ReaderBuilder<'s> {
	reader_schema: Option<&'s Schema>,
}

impl<'s> ReaderBuilder<'s> {
	/// Construct a reader builder with no reader schema override
	pub fn new() -> Self {
		Self {
			reader_schema: None,
		}
	}

	/// Decode values as this schema instead of the writer schema embedded in
	/// the file, applying Avro schema resolution between the two
	pub fn reader_schema(mut self, reader_schema: &'s Schema) -> Self {
		self.reader_schema = Some(reader_schema);
		self
	}

	/// Build the [`Reader`] over a slice
	pub fn from_slice(self, slice: &[u8]) -> Result<Reader<&[u8]>, Error> {
		Reader::new_inner(slice, self.reader_schema)
	}

	/// Build the [`Reader`] over any `impl BufRead`
	pub fn from_reader<R: BufRead>(self, source: R) -> Result<Reader<R>, Error> {
		Reader::new_inner(source, self.reader_schema)
	}
}

impl Default for ReaderBuilder<'_> {
	fn default() -> Self {
		Self::new()
	}
}

impl<'a> Reader<&'a [u8]> {
	/// Initialize a `Reader` from a slice
	pub fn from_slice(slice: &'a [u8]) -> Result<Self, Error> {
		Self::new_inner(slice, None)
	}
}

impl<R: BufRead> Reader<R> {
	/// Initialize a `Reader` from any `impl BufRead`
	///
	/// Note that this reads and validates the header during initialization.
	pub fn new(source: R) -> Result<Self, Error> {
		Self::new_inner(source, None)
	}

	fn new_inner(mut source: R, reader_schema: Option<&Schema>) -> Result<Self, Error> {
		// <magic><metadata map<string, bytes>><16-byte sync marker>
		let magic: [u8; 4] = read::read_const_size_buf(&mut source).map_err(|_| {
			Error::new(
				ErrorKind::InvalidHeader,
				"Input is not an avro object container file: could not read the magic bytes",
			)
		})?;
		if magic != HEADER_CONST {
			return Err(Error::new(
				ErrorKind::InvalidHeader,
				"Input is not an avro object container file: magic bytes mismatch",
			));
		}

		let metadata = read_metadata_map(&mut source).map_err(|e| {
			Error::msg(
				ErrorKind::InvalidHeader,
				format_args!("Malformed container file header metadata map: {e}"),
			)
		})?;

		let missing_key = |key: &str| {
			Error::msg(
				ErrorKind::InvalidHeader,
				format_args!("Container file header metadata is missing the {key:?} entry"),
			)
		};
		let utf8_value = |key: &str, bytes: &[u8]| -> Result<String, Error> {
			std::str::from_utf8(bytes).map(str::to_owned).map_err(|_| {
				Error::msg(
					ErrorKind::InvalidHeader,
					format_args!("Container file header metadata {key:?} entry is not UTF-8"),
				)
			})
		};

		let schema_json = utf8_value(
			SCHEMA_METADATA_KEY,
			metadata
				.get(SCHEMA_METADATA_KEY)
				.ok_or_else(|| missing_key(SCHEMA_METADATA_KEY))?,
		)?;
		let schema: Schema = schema_json.parse()?;

		let codec_name = utf8_value(
			CODEC_METADATA_KEY,
			metadata
				.get(CODEC_METADATA_KEY)
				.ok_or_else(|| missing_key(CODEC_METADATA_KEY))?,
		)?;
		let compression = Compression::from_name(&codec_name)?;

		let sync_marker: [u8; 16] = read::read_const_size_buf(&mut source).map_err(|_| {
			Error::new(
				ErrorKind::InvalidHeader,
				"Container file header ends before its sync marker",
			)
		})?;

		let plan = ReadPlan::new(&schema, reader_schema)?;

		Ok(Self {
			source,
			schema,
			plan,
			compression,
			metadata,
			sync_marker,
			block: Cursor::new(Vec::new()),
			remaining: 0,
			errored: false,
		})
	}

	/// Whether another item is available, advancing block framing on demand
	///
	/// A `false` answer means clean end of file. Framing errors (truncated
	/// block, sync marker mismatch, codec corruption) surface here and are
	/// final.
	pub fn has_next(&mut self) -> Result<bool, Error> {
		loop {
			if self.remaining > 0 {
				return Ok(true);
			}
			// A fully consumed block must have been consumed exactly
			let block_len = self.block.get_ref().len() as u64;
			if self.block.position() < block_len {
				return Err(Error::msg(
					ErrorKind::InvalidData,
					format_args!(
						"Block decoded to fewer bytes than its payload: {} trailing",
						block_len - self.block.position()
					),
				));
			}
			if self
				.source
				.fill_buf()
				.map_err(Error::io)?
				.is_empty()
			{
				return Ok(false);
			}
			self.advance_block()?;
		}
	}

	/// Decode one item from the current block
	///
	/// Calling this without a preceding `true` [`has_next`](Self::has_next)
	/// when no items remain fails with
	/// [`UnexpectedEnd`](ErrorKind::UnexpectedEnd).
	pub fn read(&mut self) -> Result<Value, Error> {
		if self.remaining == 0 && !self.has_next()? {
			return Err(Error::new(
				ErrorKind::UnexpectedEnd,
				"No more items in the container file",
			));
		}
		let decoded = de::decode(&self.plan, self.plan.root, &mut self.block)?;
		self.remaining -= 1;
		Ok(decoded)
	}

	/// Read the next block framing: `<count><byte length><data><sync>`
	fn advance_block(&mut self) -> Result<(), Error> {
		let count = read::read_long(&mut self.source)?;
		let count: u64 = count.try_into().map_err(|_| {
			Error::msg(
				ErrorKind::MalformedLength,
				format_args!("Invalid container file block item count: {count}"),
			)
		})?;
		let byte_len = read::read_long(&mut self.source)?;
		if byte_len < 0 || byte_len > i32::MAX as i64 {
			return Err(Error::msg(
				ErrorKind::MalformedLength,
				format_args!("Invalid container file block byte length: {byte_len}"),
			));
		}
		let compressed = read::read_vec(&mut self.source, byte_len as usize)?;
		let trailing_sync: [u8; 16] = read::read_const_size_buf(&mut self.source)?;
		if trailing_sync != self.sync_marker {
			return Err(Error::new(
				ErrorKind::SyncMarkerMismatch,
				"Sync marker at end of block does not match the file header's",
			));
		}

		let mut block = std::mem::take(self.block.get_mut());
		decompression::decompress_block(self.compression, compressed, &mut block)?;
		self.block = Cursor::new(block);
		self.remaining = count;
		Ok(())
	}

	/// The writer schema embedded in the container file header
	pub fn schema(&self) -> &Schema {
		&self.schema
	}

	/// A header metadata entry, by key
	///
	/// All entries are preserved, including the `avro.`-reserved ones.
	pub fn meta(&self, key: &str) -> Option<&[u8]> {
		self.metadata.get(key).map(Vec::as_slice)
	}

	/// All header metadata entries
	pub fn metadata(&self) -> &HashMap<String, Vec<u8>> {
		&self.metadata
	}

	/// Release and return the underlying source
	pub fn into_inner(self) -> R {
		self.source
	}
}

impl<R: BufRead> Iterator for Reader<R> {
	type Item = Result<Value, Error>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.errored {
			// Errors from this reader typically reproduce on every call;
			// yield them once, then pretend we reached EOF so that callers
			// collecting items do not loop forever
			return None;
		}
		match self.has_next() {
			Ok(false) => None,
			Ok(true) => {
				let item = self.read();
				self.errored = item.is_err();
				Some(item)
			}
			Err(e) => {
				self.errored = true;
				Some(Err(e))
			}
		}
	}
}

/// Decode the header metadata, an avro `map<bytes>`
fn read_metadata_map<R: BufRead>(source: &mut R) -> Result<HashMap<String, Vec<u8>>, Error> {
	let mut metadata = HashMap::new();
	loop {
		let (count, _) = read::read_block_header(source)?;
		if count == 0 {
			return Ok(metadata);
		}
		for _ in 0..count {
			let key = read::read_string(source)?;
			let len = read::read_len(source)?;
			let meta_value = read::read_vec(source, len)?;
			metadata.insert(key, meta_value);
		}
	}
}

use avro_container::{
	object_container_file_encoding::{Compression, Reader, ReaderBuilder, WriterBuilder},
	ErrorKind, Schema, Value,
};

use pretty_assertions::assert_eq;

const SYNC_MARKER: [u8; 16] = *b"sixteen-byte-mrk";

fn long_schema() -> Schema {
	r#""long""#.parse().unwrap()
}

#[test]
fn empty_file() {
	let schema: Schema = r#""int""#.parse().unwrap();
	let mut writer = WriterBuilder::new(&schema)
		.sync_marker(SYNC_MARKER)
		.build(Vec::new());
	writer.close().unwrap();
	let encoded = writer.into_inner().unwrap();

	// <magic 4> <map: count 1, "avro.codec"(1+10) "null"(1+4),
	// "avro.schema"(1+11) "\"int\""(1+5), terminator 1> <sync 16>
	assert_eq!(encoded.len(), 4 + (1 + 11 + 5 + 12 + 6 + 1) + 16);
	assert_eq!(&encoded[..4], b"Obj\x01");
	assert_eq!(&encoded[encoded.len() - 16..], &SYNC_MARKER);

	let mut reader = Reader::from_slice(&encoded).unwrap();
	assert!(!reader.has_next().unwrap());
	assert_eq!(reader.schema(), &schema);
	assert_eq!(reader.meta("avro.codec"), Some(&b"null"[..]));
}

#[test]
fn long_sequence_round_trip() {
	let schema = long_schema();
	let values: Vec<Value> = [0i64, -1, 1, 63, 64, -64, -65, 2147483647, -2147483648]
		.into_iter()
		.map(Value::Long)
		.collect();

	let mut writer = WriterBuilder::new(&schema).build(Vec::new());
	writer.append_all(&values).unwrap();
	let encoded = writer.into_inner().unwrap();

	let decoded: Vec<Value> = Reader::from_slice(&encoded)
		.unwrap()
		.collect::<Result<_, _>>()
		.unwrap();
	assert_eq!(decoded, values);
}

#[test]
fn record_with_union_wire_format() {
	let schema: Schema = r#"{
		"type": "record",
		"name": "P",
		"fields": [
			{ "name": "n", "type": "string" },
			{ "name": "a", "type": ["null", "int"] }
		]
	}"#
	.parse()
	.unwrap();

	let values = [
		Value::Record(vec![
			("n".to_owned(), Value::String("x".to_owned())),
			("a".to_owned(), Value::Union(0, Box::new(Value::Null))),
		]),
		Value::Record(vec![
			("n".to_owned(), Value::String("y".to_owned())),
			("a".to_owned(), Value::Union(1, Box::new(Value::Int(42)))),
		]),
	];

	let mut writer = WriterBuilder::new(&schema)
		.sync_marker(SYNC_MARKER)
		.build(Vec::new());
	writer.append_all(&values).unwrap();
	let encoded = writer.into_inner().unwrap();

	// One block: the payload sits between the block header and the final
	// sync marker. Variant indices 0 and 1 precede the union payloads.
	let expected_payload: &[u8] = &[
		0x02, b'x', 0x00, // {"n": "x", "a": null}
		0x02, b'y', 0x02, 0x54, // {"n": "y", "a": 42}
	];
	let payload_start = encoded.len() - 16 - expected_payload.len();
	assert_eq!(&encoded[payload_start..encoded.len() - 16], expected_payload);

	let decoded: Vec<Value> = Reader::from_slice(&encoded)
		.unwrap()
		.collect::<Result<_, _>>()
		.unwrap();
	assert_eq!(decoded, values);
}

#[cfg(feature = "deflate")]
#[test]
fn deflate_codec() {
	let schema = long_schema();
	let values: Vec<Value> = (0..100i64).map(Value::Long).collect();

	let write_with = |compression| {
		let mut writer = WriterBuilder::new(&schema)
			.compression(compression)
			.sync_marker(SYNC_MARKER)
			.build(Vec::new());
		writer.append_all(&values).unwrap();
		writer.into_inner().unwrap()
	};
	let null_encoded = write_with(Compression::Null);
	let deflate_encoded = write_with(Compression::Deflate {
		level: Default::default(),
	});

	// Same framing, different block payload bytes
	assert_ne!(null_encoded, deflate_encoded);
	assert_eq!(
		Reader::from_slice(&deflate_encoded)
			.unwrap()
			.meta("avro.codec"),
		Some(&b"deflate"[..])
	);

	for encoded in [null_encoded, deflate_encoded] {
		let decoded: Vec<Value> = Reader::from_slice(&encoded)
			.unwrap()
			.collect::<Result<_, _>>()
			.unwrap();
		assert_eq!(decoded, values);
	}
}

#[cfg(feature = "snappy")]
#[test]
fn snappy_codec() {
	let schema = long_schema();
	let values: Vec<Value> = (0..100i64).map(Value::Long).collect();

	let mut writer = WriterBuilder::new(&schema)
		.compression(Compression::Snappy)
		.build(Vec::new());
	writer.append_all(&values).unwrap();
	let encoded = writer.into_inner().unwrap();

	let decoded: Vec<Value> = Reader::from_slice(&encoded)
		.unwrap()
		.collect::<Result<_, _>>()
		.unwrap();
	assert_eq!(decoded, values);
}

#[cfg(feature = "snappy")]
#[test]
fn snappy_crc_mismatch_is_codec_corrupt() {
	let schema = long_schema();
	let mut writer = WriterBuilder::new(&schema)
		.compression(Compression::Snappy)
		.sync_marker(SYNC_MARKER)
		.build(Vec::new());
	writer.append(&Value::Long(1)).unwrap();
	let mut encoded = writer.into_inner().unwrap();

	// The CRC32 occupies the 4 bytes right before the trailing sync marker
	let crc_byte = encoded.len() - 16 - 1;
	encoded[crc_byte] ^= 0xFF;

	let err = Reader::from_slice(&encoded)
		.unwrap()
		.next()
		.unwrap()
		.unwrap_err();
	assert_eq!(err.kind(), ErrorKind::CodecCorrupt);
}

#[test]
fn sync_marker_corruption_is_fatal_after_prior_blocks() {
	let schema = long_schema();
	// sync_interval of 1 byte: every append flushes its own block
	let mut writer = WriterBuilder::new(&schema)
		.sync_interval(1)
		.sync_marker(SYNC_MARKER)
		.build(Vec::new());
	writer.append(&Value::Long(10)).unwrap();
	writer.append(&Value::Long(20)).unwrap();
	let mut encoded = writer.into_inner().unwrap();

	// Flip one byte in the trailing sync of the last block
	let last = encoded.len() - 1;
	encoded[last] ^= 0x01;

	let mut reader = Reader::from_slice(&encoded).unwrap();
	assert_eq!(reader.next().unwrap().unwrap(), Value::Long(10));
	let err = reader.next().unwrap().unwrap_err();
	assert_eq!(err.kind(), ErrorKind::SyncMarkerMismatch);
	// The stream is final after a framing error
	assert!(reader.next().is_none());
}

#[test]
fn truncating_at_a_block_boundary_yields_a_valid_prefix() {
	let schema = long_schema();
	let mut writer = WriterBuilder::new(&schema)
		.sync_interval(1)
		.build(Vec::new());
	writer.append(&Value::Long(10)).unwrap();
	let boundary = writer.sync().unwrap();
	writer.append(&Value::Long(20)).unwrap();
	let encoded = writer.into_inner().unwrap();
	assert!((boundary as usize) < encoded.len());

	let decoded: Vec<Value> = Reader::from_slice(&encoded[..boundary as usize])
		.unwrap()
		.collect::<Result<_, _>>()
		.unwrap();
	assert_eq!(decoded, &[Value::Long(10)]);
}

#[test]
fn close_is_idempotent_and_appends_after_close_fail() {
	let schema = long_schema();
	let mut writer = WriterBuilder::new(&schema).build(Vec::new());
	writer.append(&Value::Long(1)).unwrap();
	writer.close().unwrap();
	writer.close().unwrap();
	let err = writer.append(&Value::Long(2)).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::WriterClosed);
	let err = writer.sync().unwrap_err();
	assert_eq!(err.kind(), ErrorKind::WriterClosed);
}

#[test]
fn failed_append_leaves_writer_usable() {
	let schema = long_schema();
	let mut writer = WriterBuilder::new(&schema).build(Vec::new());
	writer.append(&Value::Long(1)).unwrap();
	let err = writer
		.append(&Value::String("not a long".to_owned()))
		.unwrap_err();
	assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
	writer.append(&Value::Long(2)).unwrap();
	let encoded = writer.into_inner().unwrap();

	let decoded: Vec<Value> = Reader::from_slice(&encoded)
		.unwrap()
		.collect::<Result<_, _>>()
		.unwrap();
	assert_eq!(decoded, &[Value::Long(1), Value::Long(2)]);
}

#[test]
fn user_metadata_round_trips() {
	let schema = long_schema();
	let mut writer = WriterBuilder::new(&schema)
		.metadata("app.version", b"1.2.3".to_vec())
		.metadata("app.origin", b"unit-test".to_vec())
		.build(Vec::new());
	writer.append(&Value::Long(5)).unwrap();
	let encoded = writer.into_inner().unwrap();

	let reader = Reader::from_slice(&encoded).unwrap();
	assert_eq!(reader.meta("app.version"), Some(&b"1.2.3"[..]));
	assert_eq!(reader.meta("app.origin"), Some(&b"unit-test"[..]));
	assert_eq!(reader.meta("nope"), None);
}

#[test]
fn invalid_magic_is_invalid_header() {
	let schema = long_schema();
	let mut writer = WriterBuilder::new(&schema).build(Vec::new());
	writer.append(&Value::Long(1)).unwrap();
	let encoded = writer.into_inner().unwrap();

	let err = Reader::from_slice(&encoded[1..]).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::InvalidHeader);

	let err = Reader::from_slice(&[]).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::InvalidHeader);
}

#[test]
fn unknown_codec_is_unsupported() {
	let schema: Schema = r#""int""#.parse().unwrap();
	let mut writer = WriterBuilder::new(&schema)
		.sync_marker(SYNC_MARKER)
		.build(Vec::new());
	writer.close().unwrap();
	let mut encoded = writer.into_inner().unwrap();

	// Patch the codec name in place: "null" -> "lzma" (the sync marker and
	// the "int" schema contain no "null" substring)
	let position = encoded
		.windows(4)
		.position(|w| w == b"null")
		.expect("codec name present in header");
	encoded[position..position + 4].copy_from_slice(b"lzma");

	let err = Reader::from_slice(&encoded).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::UnsupportedCodec);
}

#[test]
fn blocks_flush_on_sync_interval() {
	let schema = long_schema();
	let mut writer = WriterBuilder::new(&schema)
		.sync_interval(1)
		.sync_marker(SYNC_MARKER)
		.build(Vec::new());
	writer.append(&Value::Long(1)).unwrap();
	writer.append(&Value::Long(2)).unwrap();
	writer.append(&Value::Long(3)).unwrap();
	let encoded = writer.into_inner().unwrap();

	// Three one-datum blocks, each ending with the sync marker
	let sync_count = encoded
		.windows(16)
		.filter(|w| *w == SYNC_MARKER)
		.count();
	assert_eq!(sync_count, 4, "header sync + one per block");
}

#[test]
fn truncated_block_is_unexpected_end() {
	let schema = long_schema();
	let mut writer = WriterBuilder::new(&schema).build(Vec::new());
	writer.append(&Value::Long(1)).unwrap();
	let encoded = writer.into_inner().unwrap();

	// Drop the trailing sync and one payload byte
	let mut reader = Reader::from_slice(&encoded[..encoded.len() - 17]).unwrap();
	let err = reader.next().unwrap().unwrap_err();
	assert_eq!(err.kind(), ErrorKind::UnexpectedEnd);
}

#[test]
fn reader_schema_applies_resolution() {
	let writer_schema = long_schema();
	let reader_schema: Schema = r#""double""#.parse().unwrap();

	let mut writer = WriterBuilder::new(&writer_schema).build(Vec::new());
	writer.append(&Value::Long(3)).unwrap();
	let encoded = writer.into_inner().unwrap();

	let decoded: Vec<Value> = ReaderBuilder::new()
		.reader_schema(&reader_schema)
		.from_slice(&encoded)
		.unwrap()
		.collect::<Result<_, _>>()
		.unwrap();
	assert_eq!(decoded, &[Value::Double(3.0)]);
}

#[test]
fn dropping_an_unclosed_writer_still_flushes() {
	let schema = long_schema();
	let mut sink = Vec::new();
	{
		let mut writer = WriterBuilder::new(&schema).build(&mut sink);
		writer.append(&Value::Long(9)).unwrap();
		// Dropped without close
	}
	let decoded: Vec<Value> = Reader::from_slice(&sink)
		.unwrap()
		.collect::<Result<_, _>>()
		.unwrap();
	assert_eq!(decoded, &[Value::Long(9)]);
}

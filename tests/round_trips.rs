use avro_container::{
	de::ReadPlan, from_datum, from_datum_slice, to_datum_vec, value::Duration, Schema, Value,
};

use {pretty_assertions::assert_eq, std::collections::HashMap};

fn round_trip(schema_json: &str, value: Value) {
	let schema: Schema = schema_json.parse().expect("Failed to parse schema");
	let encoded = to_datum_vec(&value, &schema).expect("Failed to encode");
	let decoded = from_datum_slice(&encoded, &schema).expect("Failed to decode");
	assert_eq!(value, decoded, "round-trip under {schema_json}");
}

#[test]
fn primitives() {
	round_trip(r#""null""#, Value::Null);
	round_trip(r#""boolean""#, Value::Boolean(true));
	round_trip(r#""boolean""#, Value::Boolean(false));
	round_trip(r#""int""#, Value::Int(i32::MIN));
	round_trip(r#""int""#, Value::Int(i32::MAX));
	round_trip(r#""long""#, Value::Long(i64::MIN));
	round_trip(r#""long""#, Value::Long(i64::MAX));
	round_trip(r#""float""#, Value::Float(3.5));
	round_trip(r#""double""#, Value::Double(-0.25));
	round_trip(r#""bytes""#, Value::Bytes(vec![0, 255, 128]));
	round_trip(r#""string""#, Value::String("héllo".to_owned()));
}

#[test]
fn boundary_longs() {
	// The values around the varint group boundaries
	for value in [0i64, -1, 1, 63, 64, -64, -65, 2147483647, -2147483648] {
		round_trip(r#""long""#, Value::Long(value));
	}
}

#[test]
fn known_zigzag_encodings() {
	let schema: Schema = r#""long""#.parse().unwrap();
	let cases: &[(i64, &[u8])] = &[
		(0, &[0x00]),
		(-1, &[0x01]),
		(1, &[0x02]),
		(63, &[0x7E]),
		(64, &[0x80, 0x01]),
		(-64, &[0x7F]),
		(-65, &[0x81, 0x01]),
	];
	for &(value, expected) in cases {
		assert_eq!(
			to_datum_vec(&Value::Long(value), &schema).unwrap(),
			expected,
			"encoding of {value}"
		);
	}
}

#[test]
fn complex_values() {
	round_trip(
		r#"{"type":"array","items":"int"}"#,
		Value::Array(vec![Value::Int(1), Value::Int(-1), Value::Int(0)]),
	);
	round_trip(r#"{"type":"array","items":"int"}"#, Value::Array(vec![]));
	round_trip(
		r#"{"type":"map","values":"string"}"#,
		Value::Map(HashMap::from([
			("a".to_owned(), Value::String("x".to_owned())),
			("b".to_owned(), Value::String("y".to_owned())),
		])),
	);
	round_trip(
		r#"{"type":"fixed","name":"quad","size":4}"#,
		Value::Fixed(vec![1, 2, 3, 4]),
	);
	round_trip(
		r#"{"type":"enum","name":"Suit","symbols":["SPADES","HEARTS"]}"#,
		Value::Enum(1, "HEARTS".to_owned()),
	);
	round_trip(
		r#"["null", "int"]"#,
		Value::Union(1, Box::new(Value::Int(42))),
	);
	round_trip(r#"["null", "int"]"#, Value::Union(0, Box::new(Value::Null)));
	round_trip(
		r#"{
			"type": "record",
			"name": "Pair",
			"fields": [
				{ "name": "left", "type": "long" },
				{ "name": "right", "type": "string" }
			]
		}"#,
		Value::Record(vec![
			("left".to_owned(), Value::Long(-3)),
			("right".to_owned(), Value::String("r".to_owned())),
		]),
	);
}

#[test]
fn recursive_record() {
	let schema_json = r#"{
		"type": "record",
		"name": "LinkedList",
		"fields": [
			{ "name": "head", "type": "int" },
			{ "name": "tail", "type": ["null", "LinkedList"] }
		]
	}"#;
	let list = Value::Record(vec![
		("head".to_owned(), Value::Int(1)),
		(
			"tail".to_owned(),
			Value::Union(
				1,
				Box::new(Value::Record(vec![
					("head".to_owned(), Value::Int(2)),
					("tail".to_owned(), Value::Union(0, Box::new(Value::Null))),
				])),
			),
		),
	]);
	round_trip(schema_json, list);
}

#[test]
fn bare_values_select_union_variants() {
	let schema: Schema = r#"["null", "string", "long"]"#.parse().unwrap();
	// A bare value gets the variant picked from its runtime shape; the
	// decoded value is tagged with that variant
	let encoded = to_datum_vec(&Value::Long(7), &schema).unwrap();
	assert_eq!(encoded, &[0x04, 0x0E]);
	assert_eq!(
		from_datum_slice(&encoded, &schema).unwrap(),
		Value::Union(2, Box::new(Value::Long(7)))
	);
	// Numeric promotion applies when no exact variant exists
	let promoted = to_datum_vec(&Value::Int(7), &schema).unwrap();
	assert_eq!(promoted, &[0x04, 0x0E]);
}

#[test]
fn duration_wire_format() {
	let schema: Schema = r#"{"type":"fixed","name":"d","size":12,"logicalType":"duration"}"#
		.parse()
		.unwrap();
	let value = Value::Duration(Duration {
		months: 1,
		days: 2,
		millis: 3,
	});
	let encoded = to_datum_vec(&value, &schema).unwrap();
	assert_eq!(
		encoded,
		&[0x01, 0, 0, 0, 0x02, 0, 0, 0, 0x03, 0, 0, 0],
		"three little-endian u32s"
	);
	assert_eq!(from_datum_slice(&encoded, &schema).unwrap(), value);
}

#[test]
fn decimal_over_bytes() {
	let schema: Schema = r#"{"type":"bytes","logicalType":"decimal","precision":6,"scale":2}"#
		.parse()
		.unwrap();
	let value = Value::Decimal(rust_decimal::Decimal::new(123, 2)); // 1.23
	let encoded = to_datum_vec(&value, &schema).unwrap();
	// length 1, then the unscaled integer 123
	assert_eq!(encoded, &[0x02, 123]);
	assert_eq!(from_datum_slice(&encoded, &schema).unwrap(), value);

	let negative = Value::Decimal(rust_decimal::Decimal::new(-1, 2)); // -0.01
	let encoded = to_datum_vec(&negative, &schema).unwrap();
	assert_eq!(encoded, &[0x02, 0xFF]);
	assert_eq!(from_datum_slice(&encoded, &schema).unwrap(), negative);
}

#[test]
fn decimal_over_fixed() {
	let schema: Schema = r#"{
		"type": "fixed",
		"name": "dec",
		"size": 4,
		"logicalType": "decimal",
		"precision": 9,
		"scale": 0
	}"#
	.parse()
	.unwrap();
	let value = Value::Decimal(rust_decimal::Decimal::new(-2, 0));
	let encoded = to_datum_vec(&value, &schema).unwrap();
	// Sign-extended to the full fixed width
	assert_eq!(encoded, &[0xFF, 0xFF, 0xFF, 0xFE]);
	assert_eq!(from_datum_slice(&encoded, &schema).unwrap(), value);
}

#[test]
fn decimal_scale_mismatch_fails() {
	let schema: Schema = r#"{"type":"bytes","logicalType":"decimal","precision":6,"scale":1}"#
		.parse()
		.unwrap();
	let too_precise = Value::Decimal(rust_decimal::Decimal::new(123, 2)); // 1.23
	let err = to_datum_vec(&too_precise, &schema).unwrap_err();
	assert_eq!(err.kind(), avro_container::ErrorKind::SchemaMismatch);
}

#[test]
fn date_and_timestamp_pass_through_as_base_types() {
	round_trip(r#"{"type":"int","logicalType":"date"}"#, Value::Int(19000));
	round_trip(
		r#"{"type":"long","logicalType":"timestamp-millis"}"#,
		Value::Long(1_500_000_000_000),
	);
	round_trip(
		r#"{"type":"string","logicalType":"uuid"}"#,
		Value::String("f81d4fae-7dec-11d0-a765-00a0c91e6bf6".to_owned()),
	);
}

#[test]
fn missing_record_field_uses_default_or_fails() {
	let with_default: Schema = r#"{
		"type": "record",
		"name": "R",
		"fields": [{ "name": "x", "type": "int", "default": 5 }]
	}"#
	.parse()
	.unwrap();
	let encoded = to_datum_vec(&Value::Record(vec![]), &with_default).unwrap();
	assert_eq!(
		from_datum_slice(&encoded, &with_default).unwrap(),
		Value::Record(vec![("x".to_owned(), Value::Int(5))])
	);

	let without_default: Schema = r#"{
		"type": "record",
		"name": "R",
		"fields": [{ "name": "x", "type": "int" }]
	}"#
	.parse()
	.unwrap();
	let err = to_datum_vec(&Value::Record(vec![]), &without_default).unwrap_err();
	assert_eq!(err.kind(), avro_container::ErrorKind::SchemaMismatch);
}

#[test]
fn schema_mismatches_are_rejected() {
	let schema: Schema = r#""int""#.parse().unwrap();
	let err = to_datum_vec(&Value::String("no".to_owned()), &schema).unwrap_err();
	assert_eq!(err.kind(), avro_container::ErrorKind::SchemaMismatch);

	let fixed: Schema = r#"{"type":"fixed","name":"f","size":3}"#.parse().unwrap();
	let err = to_datum_vec(&Value::Fixed(vec![1, 2]), &fixed).unwrap_err();
	assert_eq!(err.kind(), avro_container::ErrorKind::SchemaMismatch);

	let enum_: Schema = r#"{"type":"enum","name":"E","symbols":["A"]}"#.parse().unwrap();
	let err = to_datum_vec(&Value::Enum(0, "Z".to_owned()), &enum_).unwrap_err();
	assert_eq!(err.kind(), avro_container::ErrorKind::SchemaMismatch);

	let union: Schema = r#"["null", "int"]"#.parse().unwrap();
	let err = to_datum_vec(&Value::String("no".to_owned()), &union).unwrap_err();
	assert_eq!(err.kind(), avro_container::ErrorKind::SchemaMismatch);
}

#[test]
fn truncated_datum_fails_with_unexpected_end() {
	let schema: Schema = r#""string""#.parse().unwrap();
	let encoded = to_datum_vec(&Value::String("hello".to_owned()), &schema).unwrap();
	let err = from_datum_slice(&encoded[..3], &schema).unwrap_err();
	assert_eq!(err.kind(), avro_container::ErrorKind::UnexpectedEnd);
}

#[test]
fn negative_length_fails_with_malformed_length() {
	let schema: Schema = r#""bytes""#.parse().unwrap();
	// zigzag(-3) = 5
	let err = from_datum_slice(&[0x05], &schema).unwrap_err();
	assert_eq!(err.kind(), avro_container::ErrorKind::MalformedLength);
}

#[test]
fn read_plan_reuse() {
	let schema: Schema = r#""int""#.parse().unwrap();
	let plan = ReadPlan::new(&schema, None).unwrap();
	for value in [-1, 0, 1, i32::MAX] {
		let encoded = to_datum_vec(&Value::Int(value), &schema).unwrap();
		assert_eq!(
			from_datum(encoded.as_slice(), &plan).unwrap(),
			Value::Int(value)
		);
	}
}

#[test]
fn map_and_array_accept_negative_count_blocks() {
	// A block with count -2 carries its byte length, then the items
	let schema: Schema = r#"{"type":"array","items":"int"}"#.parse().unwrap();
	let encoded: &[u8] = &[
		0x03, // count: zigzag(-2)
		0x04, // byte length: zigzag(2)
		0x02, // 1
		0x04, // 2
		0x00, // terminator
	];
	assert_eq!(
		from_datum_slice(encoded, &schema).unwrap(),
		Value::Array(vec![Value::Int(1), Value::Int(2)])
	);
}

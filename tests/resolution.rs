//! Writer-schema / reader-schema resolution

use avro_container::{de::ReadPlan, from_datum, to_datum_vec, ErrorKind, Schema, Value};

use pretty_assertions::assert_eq;

fn resolve(writer_json: &str, reader_json: &str, value: &Value) -> Result<Value, avro_container::Error> {
	let writer: Schema = writer_json.parse().unwrap();
	let reader: Schema = reader_json.parse().unwrap();
	let encoded = to_datum_vec(value, &writer).unwrap();
	let plan = ReadPlan::new(&writer, Some(&reader))?;
	from_datum(encoded.as_slice(), &plan)
}

#[test]
fn numeric_promotions() {
	assert_eq!(
		resolve(r#""int""#, r#""long""#, &Value::Int(42)).unwrap(),
		Value::Long(42)
	);
	assert_eq!(
		resolve(r#""int""#, r#""float""#, &Value::Int(-3)).unwrap(),
		Value::Float(-3.0)
	);
	assert_eq!(
		resolve(r#""int""#, r#""double""#, &Value::Int(7)).unwrap(),
		Value::Double(7.0)
	);
	assert_eq!(
		resolve(r#""long""#, r#""float""#, &Value::Long(1 << 20)).unwrap(),
		Value::Float(1048576.0)
	);
	assert_eq!(
		resolve(r#""long""#, r#""double""#, &Value::Long(-5)).unwrap(),
		Value::Double(-5.0)
	);
	assert_eq!(
		resolve(r#""float""#, r#""double""#, &Value::Float(0.5)).unwrap(),
		Value::Double(0.5)
	);
}

#[test]
fn demotions_are_incompatible() {
	let err = resolve(r#""long""#, r#""int""#, &Value::Long(1)).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::SchemaIncompatible);
	let err = resolve(r#""double""#, r#""float""#, &Value::Double(1.0)).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::SchemaIncompatible);
	let err = resolve(r#""boolean""#, r#""int""#, &Value::Boolean(true)).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::SchemaIncompatible);
}

#[test]
fn string_bytes_crossover() {
	assert_eq!(
		resolve(r#""string""#, r#""bytes""#, &Value::String("hi".to_owned())).unwrap(),
		Value::Bytes(b"hi".to_vec())
	);
	assert_eq!(
		resolve(r#""bytes""#, r#""string""#, &Value::Bytes(b"hi".to_vec())).unwrap(),
		Value::String("hi".to_owned())
	);
}

#[test]
fn writer_only_fields_are_skipped() {
	let writer = r#"{
		"type": "record",
		"name": "R",
		"fields": [
			{ "name": "keep", "type": "string" },
			{ "name": "drop_me", "type": { "type": "array", "items": "long" } },
			{ "name": "also_keep", "type": "int" }
		]
	}"#;
	let reader = r#"{
		"type": "record",
		"name": "R",
		"fields": [
			{ "name": "keep", "type": "string" },
			{ "name": "also_keep", "type": "int" }
		]
	}"#;
	let value = Value::Record(vec![
		("keep".to_owned(), Value::String("k".to_owned())),
		(
			"drop_me".to_owned(),
			Value::Array(vec![Value::Long(1), Value::Long(2)]),
		),
		("also_keep".to_owned(), Value::Int(3)),
	]);
	assert_eq!(
		resolve(writer, reader, &value).unwrap(),
		Value::Record(vec![
			("keep".to_owned(), Value::String("k".to_owned())),
			("also_keep".to_owned(), Value::Int(3)),
		])
	);
}

#[test]
fn reader_only_fields_take_their_default() {
	let writer = r#"{
		"type": "record",
		"name": "R",
		"fields": [{ "name": "a", "type": "long" }]
	}"#;
	let reader = r#"{
		"type": "record",
		"name": "R",
		"fields": [
			{ "name": "a", "type": "long" },
			{ "name": "b", "type": "string", "default": "fallback" },
			{ "name": "c", "type": ["null", "int"], "default": null }
		]
	}"#;
	let value = Value::Record(vec![("a".to_owned(), Value::Long(1))]);
	assert_eq!(
		resolve(writer, reader, &value).unwrap(),
		Value::Record(vec![
			("a".to_owned(), Value::Long(1)),
			("b".to_owned(), Value::String("fallback".to_owned())),
			("c".to_owned(), Value::Union(0, Box::new(Value::Null))),
		])
	);
}

#[test]
fn reader_only_field_without_default_is_incompatible() {
	let writer = r#"{
		"type": "record",
		"name": "R",
		"fields": [{ "name": "a", "type": "long" }]
	}"#;
	let reader = r#"{
		"type": "record",
		"name": "R",
		"fields": [
			{ "name": "a", "type": "long" },
			{ "name": "b", "type": "string" }
		]
	}"#;
	let err = resolve(writer, reader, &Value::Record(vec![("a".to_owned(), Value::Long(1))]))
		.unwrap_err();
	assert_eq!(err.kind(), ErrorKind::SchemaIncompatible);
}

#[test]
fn enum_symbols_resolve_by_name() {
	let writer = r#"{"type":"enum","name":"E","symbols":["A","B","C"]}"#;
	let reader = r#"{"type":"enum","name":"E","symbols":["B","A"]}"#;

	// "A" sits at writer position 0 but reader position 1
	assert_eq!(
		resolve(writer, reader, &Value::Enum(0, "A".to_owned())).unwrap(),
		Value::Enum(1, "A".to_owned())
	);
	// "C" does not exist on the reader side; the failure only triggers
	// when the symbol is actually encountered
	let err = resolve(writer, reader, &Value::Enum(2, "C".to_owned())).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::EnumSymbolMissing);
}

#[test]
fn union_to_union_resolution() {
	let writer = r#"["null", "int"]"#;
	let reader = r#"["null", "long"]"#;
	assert_eq!(
		resolve(writer, reader, &Value::Union(1, Box::new(Value::Int(9)))).unwrap(),
		Value::Union(1, Box::new(Value::Long(9)))
	);
	assert_eq!(
		resolve(writer, reader, &Value::Union(0, Box::new(Value::Null))).unwrap(),
		Value::Union(0, Box::new(Value::Null))
	);
}

#[test]
fn non_union_writer_into_union_reader() {
	let writer = r#""int""#;
	let reader = r#"["null", "long"]"#;
	assert_eq!(
		resolve(writer, reader, &Value::Int(5)).unwrap(),
		Value::Union(1, Box::new(Value::Long(5)))
	);
}

#[test]
fn union_writer_into_non_union_reader() {
	let writer = r#"["null", "int"]"#;
	let reader = r#""long""#;
	// The int variant resolves fine
	assert_eq!(
		resolve(writer, reader, &Value::Union(1, Box::new(Value::Int(6)))).unwrap(),
		Value::Long(6)
	);
	// The null variant cannot become a long; this only fails when that
	// variant is encountered on the wire
	let err = resolve(writer, reader, &Value::Union(0, Box::new(Value::Null))).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::SchemaIncompatible);
}

#[test]
fn fixed_must_match_name_and_size() {
	let writer = r#"{"type":"fixed","name":"F","size":2}"#;
	let value = Value::Fixed(vec![1, 2]);

	assert_eq!(
		resolve(writer, r#"{"type":"fixed","name":"F","size":2}"#, &value).unwrap(),
		value
	);
	let err = resolve(writer, r#"{"type":"fixed","name":"F","size":3}"#, &value).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::SchemaIncompatible);
	let err = resolve(writer, r#"{"type":"fixed","name":"G","size":2}"#, &value).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::SchemaIncompatible);
}

#[test]
fn arrays_and_maps_resolve_on_their_element_schema() {
	assert_eq!(
		resolve(
			r#"{"type":"array","items":"int"}"#,
			r#"{"type":"array","items":"double"}"#,
			&Value::Array(vec![Value::Int(1), Value::Int(2)]),
		)
		.unwrap(),
		Value::Array(vec![Value::Double(1.0), Value::Double(2.0)])
	);

	let map = Value::Map(std::collections::HashMap::from([(
		"k".to_owned(),
		Value::String("v".to_owned()),
	)]));
	assert_eq!(
		resolve(
			r#"{"type":"map","values":"string"}"#,
			r#"{"type":"map","values":"bytes"}"#,
			&map,
		)
		.unwrap(),
		Value::Map(std::collections::HashMap::from([(
			"k".to_owned(),
			Value::Bytes(b"v".to_vec()),
		)]))
	);
}

#[test]
fn recursive_schema_resolution() {
	// Reader adds a defaulted field to a self-referential record
	let writer = r#"{
		"type": "record",
		"name": "Node",
		"fields": [
			{ "name": "next", "type": ["null", "Node"] }
		]
	}"#;
	let reader = r#"{
		"type": "record",
		"name": "Node",
		"fields": [
			{ "name": "next", "type": ["null", "Node"] },
			{ "name": "label", "type": "string", "default": "?" }
		]
	}"#;
	let value = Value::Record(vec![(
		"next".to_owned(),
		Value::Union(
			1,
			Box::new(Value::Record(vec![(
				"next".to_owned(),
				Value::Union(0, Box::new(Value::Null)),
			)])),
		),
	)]);
	assert_eq!(
		resolve(writer, reader, &value).unwrap(),
		Value::Record(vec![
			(
				"next".to_owned(),
				Value::Union(
					1,
					Box::new(Value::Record(vec![
						(
							"next".to_owned(),
							Value::Union(0, Box::new(Value::Null)),
						),
						("label".to_owned(), Value::String("?".to_owned())),
					])),
				),
			),
			("label".to_owned(), Value::String("?".to_owned())),
		])
	);
}

//! # Getting started
//!
//! ```
//! use avro_container::{
//! 	object_container_file_encoding::{Compression, Reader, WriterBuilder},
//! 	Value,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let schema: avro_container::Schema = r#"
//! {
//! 	"type": "record",
//! 	"name": "Test",
//! 	"fields": [
//! 		{ "name": "a", "type": "long" },
//! 		{ "name": "b", "type": "string" }
//! 	]
//! }
//! "#
//! .parse()?;
//!
//! let mut writer = WriterBuilder::new(&schema)
//! 	.compression(Compression::Null)
//! 	.build(Vec::new());
//! writer.append(&Value::Record(vec![
//! 	("a".to_owned(), Value::Long(27)),
//! 	("b".to_owned(), Value::String("foo".to_owned())),
//! ]))?;
//! let encoded: Vec<u8> = writer.into_inner()?;
//!
//! let mut reader = Reader::from_slice(&encoded)?;
//! assert!(reader.has_next()?);
//! assert_eq!(
//! 	reader.read()?,
//! 	Value::Record(vec![
//! 		("a".to_owned(), Value::Long(27)),
//! 		("b".to_owned(), Value::String("foo".to_owned())),
//! 	])
//! );
//! assert!(!reader.has_next()?);
//! # Ok(())
//! # }
//! ```
//!
//! # What this crate is
//!
//! An implementation of the [Avro](https://avro.apache.org/docs/current/specification/)
//! object container file encoding, from the schema JSON down to the block
//! framing:
//! - [`Schema`]: parsing, canonical JSON emission, structural equality and
//!   CRC-64-AVRO fingerprints ([`schema`] module)
//! - [`Value`]: the tagged variant that encoding consumes and decoding
//!   produces ([`value`] module)
//! - [`to_datum`]/[`from_datum`]: the raw datum codec, including resolution
//!   of a writer schema against a different reader schema
//!   ([`de::ReadPlan`])
//! - [`object_container_file_encoding`]: block-framed container files with
//!   `null`/`deflate`/`snappy` compression and 16-byte sync markers
//!
//! How an application maps its native types onto [`Value`]s is deliberately
//! out of scope: derive layers, reflection and schema registries all live
//! outside this crate.

pub mod de;
pub mod error;
pub mod object_container_file_encoding;
pub mod schema;
pub mod ser;
pub mod value;

pub use {
	de::{from_datum, from_datum_slice},
	error::{Error, ErrorKind},
	schema::Schema,
	ser::{to_datum, to_datum_vec},
	value::Value,
};

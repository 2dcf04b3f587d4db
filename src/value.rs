//! The [`Value`] variant that the encoder consumes and the decoder produces
//!
//! How an application maps its own types onto [`Value`]s is out of scope for
//! this crate: build the variant yourself (a handful of `From` conversions
//! are provided for the common cases).

use crate::{
	error::{Error, ErrorKind},
	schema::{Schema, SchemaKey, SchemaType},
};

use std::collections::HashMap;

pub use rust_decimal::Decimal;

/// An Avro value, tagged with its Avro type
///
/// This is the runtime counterpart of a [`Schema`](crate::Schema): every
/// variant corresponds to one schema type (plus the logical `decimal` and
/// `duration` interpretations, whose in-memory shape differs from their wire
/// shape). `date`, `time-*`, `timestamp-*` and `uuid` logical values travel
/// as their base [`Int`](Value::Int)/[`Long`](Value::Long)/
/// [`String`](Value::String) variants, since those logical types only assign
/// interpretation without changing representation.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
	/// A `null` Avro value
	Null,
	/// A `boolean` Avro value
	Boolean(bool),
	/// An `int` Avro value
	Int(i32),
	/// A `long` Avro value
	Long(i64),
	/// A `float` Avro value
	Float(f32),
	/// A `double` Avro value
	Double(f64),
	/// A `bytes` Avro value
	Bytes(Vec<u8>),
	/// A `string` Avro value
	String(String),
	/// A `fixed` Avro value; the length must equal the schema's `size`
	Fixed(Vec<u8>),
	/// An `enum` Avro value: position in the schema's symbol list, and the
	/// symbol itself
	Enum(usize, String),
	/// An `array` Avro value
	Array(Vec<Value>),
	/// A `map` Avro value
	Map(HashMap<String, Value>),
	/// A `record` Avro value: field name/value pairs in declaration order
	Record(Vec<(String, Value)>),
	/// A `union` Avro value: the zero-based variant position within the
	/// union, and the value itself
	Union(usize, Box<Value>),
	/// A `decimal` logical value, stored on the wire as its unscaled
	/// two's-complement big-endian integer over `bytes` or `fixed`
	Decimal(Decimal),
	/// A `duration` logical value, stored on the wire as a `fixed(12)`
	Duration(Duration),
}

impl Value {
	/// The name of the variant, for error messages
	pub(crate) fn type_name(&self) -> &'static str {
		match self {
			Value::Null => "null",
			Value::Boolean(_) => "boolean",
			Value::Int(_) => "int",
			Value::Long(_) => "long",
			Value::Float(_) => "float",
			Value::Double(_) => "double",
			Value::Bytes(_) => "bytes",
			Value::String(_) => "string",
			Value::Fixed(_) => "fixed",
			Value::Enum(_, _) => "enum",
			Value::Array(_) => "array",
			Value::Map(_) => "map",
			Value::Record(_) => "record",
			Value::Union(_, _) => "union",
			Value::Decimal(_) => "decimal",
			Value::Duration(_) => "duration",
		}
	}
}

/// A `duration` logical value: months, days and milliseconds
///
/// On the wire this is a `fixed` of size 12 holding the three components as
/// consecutive little-endian unsigned 32-bit integers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Duration {
	/// Number of months
	pub months: u32,
	/// Number of days
	pub days: u32,
	/// Number of milliseconds
	pub millis: u32,
}

impl Duration {
	/// The 12-byte wire representation of this duration
	pub fn to_bytes(self) -> [u8; 12] {
		let mut bytes = [0u8; 12];
		bytes[0..4].copy_from_slice(&self.months.to_le_bytes());
		bytes[4..8].copy_from_slice(&self.days.to_le_bytes());
		bytes[8..12].copy_from_slice(&self.millis.to_le_bytes());
		bytes
	}

	/// Reconstruct a duration from its 12-byte wire representation
	pub fn from_bytes(bytes: [u8; 12]) -> Self {
		let u32_at = |i: usize| u32::from_le_bytes(bytes[i..i + 4].try_into().expect("4 bytes"));
		Self {
			months: u32_at(0),
			days: u32_at(4),
			millis: u32_at(8),
		}
	}
}

macro_rules! impl_value_froms {
	($($from: ty => $variant: ident,)*) => {
		$(
			impl From<$from> for Value {
				fn from(v: $from) -> Self {
					Value::$variant(v.into())
				}
			}
		)*
	};
}
impl_value_froms! {
	bool => Boolean,
	i32 => Int,
	i64 => Long,
	f32 => Float,
	f64 => Double,
	Vec<u8> => Bytes,
	String => String,
	&str => String,
	Duration => Duration,
	Decimal => Decimal,
}

impl From<()> for Value {
	fn from((): ()) -> Self {
		Value::Null
	}
}

/// The unscaled two's-complement big-endian representation of a decimal,
/// trimmed to the minimal number of bytes
pub(crate) fn decimal_to_big_endian(decimal: &Decimal, scale: u32) -> Result<Vec<u8>, Error> {
	let mut rescaled = *decimal;
	rescaled.rescale(scale);
	if rescaled != *decimal {
		return Err(Error::msg(
			ErrorKind::SchemaMismatch,
			format_args!("Decimal value {decimal} cannot be represented at scale {scale}"),
		));
	}
	let unscaled: i128 = rescaled.mantissa();
	let full = unscaled.to_be_bytes();
	// Drop redundant leading sign bytes, keeping the sign bit intact
	let mut start = 0;
	while start < full.len() - 1 {
		let (byte, next) = (full[start], full[start + 1]);
		let redundant = (byte == 0x00 && next < 0x80) || (byte == 0xFF && next >= 0x80);
		if !redundant {
			break;
		}
		start += 1;
	}
	Ok(full[start..].to_vec())
}

/// Reconstruct a decimal from its unscaled two's-complement big-endian
/// representation
pub(crate) fn decimal_from_big_endian(bytes: &[u8], scale: u32) -> Result<Decimal, Error> {
	if bytes.is_empty() || bytes.len() > 16 {
		return Err(Error::msg(
			ErrorKind::InvalidData,
			format_args!(
				"Decimal wire representation must be 1 to 16 bytes, got {}",
				bytes.len()
			),
		));
	}
	let fill = if bytes[0] >= 0x80 { 0xFF } else { 0x00 };
	let mut full = [fill; 16];
	full[16 - bytes.len()..].copy_from_slice(bytes);
	let unscaled = i128::from_be_bytes(full);
	Decimal::try_from_i128_with_scale(unscaled, scale).map_err(|e| {
		Error::msg(
			ErrorKind::InvalidData,
			format_args!("Decimal value does not fit the supported range: {e}"),
		)
	})
}

/// Instantiate a schema-JSON default value (as carried by a record field
/// declaration) as a [`Value`] of the given schema
pub(crate) fn value_from_default(
	schema: &Schema,
	key: SchemaKey,
	default: &serde_json::Value,
) -> Result<Value, Error> {
	let node = schema.get(key).ok_or_else(|| {
		Error::new(
			ErrorKind::SchemaIncompatible,
			"Default value refers to non-existing schema node",
		)
	})?;
	let mismatch = || {
		Error::msg(
			ErrorKind::SchemaIncompatible,
			format_args!(
				"Default value {default} is not valid for {} schema",
				node.type_.type_name()
			),
		)
	};
	Ok(match node.type_ {
		SchemaType::Null => match default {
			serde_json::Value::Null => Value::Null,
			_ => return Err(mismatch()),
		},
		SchemaType::Boolean => Value::Boolean(default.as_bool().ok_or_else(mismatch)?),
		SchemaType::Int => Value::Int(
			default
				.as_i64()
				.and_then(|v| i32::try_from(v).ok())
				.ok_or_else(mismatch)?,
		),
		SchemaType::Long => Value::Long(default.as_i64().ok_or_else(mismatch)?),
		SchemaType::Float => Value::Float(default.as_f64().ok_or_else(mismatch)? as f32),
		SchemaType::Double => Value::Double(default.as_f64().ok_or_else(mismatch)?),
		SchemaType::Bytes => Value::Bytes(json_string_to_bytes(default).ok_or_else(mismatch)?),
		SchemaType::String => Value::String(default.as_str().ok_or_else(mismatch)?.to_owned()),
		SchemaType::Fixed(ref fixed) => {
			let bytes = json_string_to_bytes(default).ok_or_else(mismatch)?;
			if bytes.len() != fixed.size {
				return Err(mismatch());
			}
			Value::Fixed(bytes)
		}
		SchemaType::Enum(ref enum_) => {
			let symbol = default.as_str().ok_or_else(mismatch)?;
			let position = enum_
				.symbols
				.iter()
				.position(|s| s == symbol)
				.ok_or_else(mismatch)?;
			Value::Enum(position, symbol.to_owned())
		}
		SchemaType::Array(ref array) => Value::Array(
			default
				.as_array()
				.ok_or_else(mismatch)?
				.iter()
				.map(|item| value_from_default(schema, array.items, item))
				.collect::<Result<_, _>>()?,
		),
		SchemaType::Map(ref map) => Value::Map(
			default
				.as_object()
				.ok_or_else(mismatch)?
				.iter()
				.map(|(k, v)| Ok((k.clone(), value_from_default(schema, map.values, v)?)))
				.collect::<Result<_, Error>>()?,
		),
		SchemaType::Record(ref record) => Value::Record(
			record
				.fields
				.iter()
				.map(|field| {
					let field_default = default
						.as_object()
						.ok_or_else(mismatch)?
						.get(&field.name)
						.or(field.default.as_ref())
						.ok_or_else(|| {
							Error::msg(
								ErrorKind::SchemaIncompatible,
								format_args!(
									"Default value for record is missing field {:?}",
									field.name
								),
							)
						})?;
					Ok((
						field.name.clone(),
						value_from_default(schema, field.type_, field_default)?,
					))
				})
				.collect::<Result<_, Error>>()?,
		),
		SchemaType::Union(ref union) => {
			// Per the Avro specification, the default of a union field
			// applies to the first variant of the union
			let first = *union.variants.first().ok_or_else(mismatch)?;
			Value::Union(0, Box::new(value_from_default(schema, first, default)?))
		}
	})
}

/// Avro JSON encodes `bytes` and `fixed` defaults as strings where each
/// character is the codepoint of one byte
fn json_string_to_bytes(json: &serde_json::Value) -> Option<Vec<u8>> {
	json.as_str()?
		.chars()
		.map(|c| u8::try_from(u32::from(c)).ok())
		.collect()
}

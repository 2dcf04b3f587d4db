//! Schema-directed encoding of [`Value`]s
//!
//! The schema graph is itself the write plan: [`encode_value`] walks it in
//! step with the value, dispatching to the primitive codec in
//! [`write`](self::write). Record fields are encoded in declared order,
//! union variants are selected from the runtime shape of the value, and
//! arrays/maps are emitted as a single count-prefixed block followed by the
//! zero terminator.

pub(crate) mod write;

use crate::{
	error::{Error, ErrorKind},
	schema::{LogicalType, Schema, SchemaKey, SchemaNode, SchemaType, Union},
	value::{self, Value},
};

use std::io::Write;

/// Encode a single datum (raw data, no header or framing) to the provided
/// writer
pub fn to_datum<W: Write>(value: &Value, mut writer: W, schema: &Schema) -> Result<W, Error> {
	encode_value(schema, schema.root_key(), value, &mut writer)?;
	Ok(writer)
}

/// Encode a single datum (raw data, no header or framing) to a newly
/// allocated `Vec`
pub fn to_datum_vec(value: &Value, schema: &Schema) -> Result<Vec<u8>, Error> {
	to_datum(value, Vec::new(), schema)
}

pub(crate) fn encode_value<W: Write>(
	schema: &Schema,
	key: SchemaKey,
	value: &Value,
	out: &mut W,
) -> Result<(), Error> {
	let node = &schema[key];

	// Logical interpretations whose in-memory shape differs from the wire
	// shape are handled up front; their base representations remain
	// accepted below.
	match (&node.logical_type, value) {
		(Some(LogicalType::Duration), Value::Duration(duration)) => {
			return out.write_all(&duration.to_bytes()).map_err(Error::io);
		}
		(Some(LogicalType::Decimal(decimal)), Value::Decimal(decimal_value)) => {
			let unscaled = value::decimal_to_big_endian(decimal_value, decimal.scale)?;
			return match node.type_ {
				SchemaType::Bytes => write::write_bytes(out, &unscaled),
				SchemaType::Fixed(ref fixed) => {
					if unscaled.len() > fixed.size {
						return Err(Error::msg(
							ErrorKind::SchemaMismatch,
							format_args!(
								"Decimal value {decimal_value} does not fit in fixed of size {}",
								fixed.size
							),
						));
					}
					// Sign-extend to the left up to the fixed size
					let fill = if unscaled[0] >= 0x80 { 0xFF } else { 0x00 };
					let mut padded = vec![fill; fixed.size];
					padded[fixed.size - unscaled.len()..].copy_from_slice(&unscaled);
					out.write_all(&padded).map_err(Error::io)
				}
				// Parsing only attaches decimal to bytes or fixed
				_ => unreachable!("decimal logical type over non-bytes non-fixed schema"),
			};
		}
		_ => {}
	}

	match (&node.type_, value) {
		(SchemaType::Null, Value::Null) => Ok(()),
		(SchemaType::Boolean, &Value::Boolean(b)) => write::write_bool(out, b),
		(SchemaType::Int, &Value::Int(i)) => write::write_int(out, i),
		(SchemaType::Long, &Value::Long(l)) => write::write_long(out, l),
		(SchemaType::Long, &Value::Int(i)) => write::write_long(out, i.into()),
		(SchemaType::Float, &Value::Float(f)) => write::write_float(out, f),
		(SchemaType::Float, &Value::Int(i)) => write::write_float(out, i as f32),
		(SchemaType::Float, &Value::Long(l)) => write::write_float(out, l as f32),
		(SchemaType::Double, &Value::Double(d)) => write::write_double(out, d),
		(SchemaType::Double, &Value::Float(f)) => write::write_double(out, f.into()),
		(SchemaType::Double, &Value::Int(i)) => write::write_double(out, i.into()),
		(SchemaType::Double, &Value::Long(l)) => write::write_double(out, l as f64),
		(SchemaType::Bytes, Value::Bytes(bytes)) => write::write_bytes(out, bytes),
		(SchemaType::Bytes, Value::String(s)) => write::write_bytes(out, s.as_bytes()),
		(SchemaType::String, Value::String(s)) => write::write_str(out, s),
		(SchemaType::String, Value::Bytes(bytes)) => match std::str::from_utf8(bytes) {
			Ok(s) => write::write_str(out, s),
			Err(_) => Err(Error::new(
				ErrorKind::SchemaMismatch,
				"Cannot encode non-UTF-8 bytes value against string schema",
			)),
		},
		(SchemaType::Fixed(fixed), Value::Fixed(bytes)) => {
			if bytes.len() != fixed.size {
				return Err(Error::msg(
					ErrorKind::SchemaMismatch,
					format_args!(
						"Fixed value for {} must be exactly {} bytes, got {}",
						fixed.name.fully_qualified_name(),
						fixed.size,
						bytes.len()
					),
				));
			}
			out.write_all(bytes).map_err(Error::io)
		}
		(SchemaType::Enum(enum_), value) => {
			let position = match value {
				Value::Enum(position, symbol) => {
					match enum_.symbols.get(*position).map(|s| s == symbol) {
						Some(true) => Some(*position),
						// Position doesn't line up with this schema's
						// symbol list, fall back to a name lookup
						_ => enum_.symbols.iter().position(|s| s == symbol),
					}
				}
				Value::String(symbol) => enum_.symbols.iter().position(|s| s == symbol),
				_ => {
					return Err(mismatch(node, value));
				}
			};
			match position {
				Some(position) => write::write_len(out, position),
				None => Err(Error::msg(
					ErrorKind::SchemaMismatch,
					format_args!(
						"Value is not a symbol of enum {}",
						enum_.name.fully_qualified_name()
					),
				)),
			}
		}
		(SchemaType::Array(array), Value::Array(items)) => {
			if !items.is_empty() {
				write::write_len(out, items.len())?;
				for item in items {
					encode_value(schema, array.items, item, out)?;
				}
			}
			write::write_long(out, 0)
		}
		(SchemaType::Map(map), Value::Map(entries)) => {
			if !entries.is_empty() {
				write::write_len(out, entries.len())?;
				for (map_key, map_value) in entries {
					write::write_str(out, map_key)?;
					encode_value(schema, map.values, map_value, out)?;
				}
			}
			write::write_long(out, 0)
		}
		(SchemaType::Record(record), Value::Record(entries)) => {
			for (position, field) in record.fields.iter().enumerate() {
				// Values are typically in declaration order, so check the
				// matching position before falling back to a scan
				let field_value = match entries.get(position) {
					Some((name, v)) if *name == field.name => Some(v),
					_ => entries
						.iter()
						.find(|(name, _)| *name == field.name)
						.map(|(_, v)| v),
				};
				match field_value {
					Some(field_value) => encode_value(schema, field.type_, field_value, out)?,
					None => match field.default {
						Some(ref default) => {
							let default_value =
								value::value_from_default(schema, field.type_, default)?;
							encode_value(schema, field.type_, &default_value, out)?
						}
						None => {
							return Err(Error::msg(
								ErrorKind::SchemaMismatch,
								format_args!(
									"Record value for {} is missing field {:?} which has no default",
									record.name.fully_qualified_name(),
									field.name
								),
							));
						}
					},
				}
			}
			Ok(())
		}
		(SchemaType::Union(union), value) => {
			let (variant_position, inner) = match value {
				Value::Union(position, inner) => match union.variants.get(*position) {
					Some(_) => (*position, &**inner),
					None => {
						return Err(Error::msg(
							ErrorKind::SchemaMismatch,
							format_args!(
								"Union value carries variant index {} but the union only has {} variants",
								position,
								union.variants.len()
							),
						));
					}
				},
				bare => match union_variant_for(schema, union, bare) {
					Some(position) => (position, bare),
					None => {
						return Err(Error::msg(
							ErrorKind::SchemaMismatch,
							format_args!(
								"No union variant matches a {} value",
								bare.type_name()
							),
						));
					}
				},
			};
			write::write_len(out, variant_position)?;
			encode_value(schema, union.variants[variant_position], inner, out)
		}
		(_, value) => Err(mismatch(node, value)),
	}
}

fn mismatch(node: &SchemaNode, value: &Value) -> Error {
	Error::msg(
		ErrorKind::SchemaMismatch,
		format_args!(
			"Cannot encode {} value against {} schema",
			value.type_name(),
			node.type_.type_name()
		),
	)
}

/// The first variant whose type-tag exactly matches the runtime shape of the
/// value, otherwise the first variant the value can be promoted into
fn union_variant_for(schema: &Schema, union: &Union, value: &Value) -> Option<usize> {
	union
		.variants
		.iter()
		.position(|&variant| variant_matches_exact(schema, variant, value))
		.or_else(|| {
			union
				.variants
				.iter()
				.position(|&variant| variant_matches_lenient(schema, variant, value))
		})
}

fn variant_matches_exact(schema: &Schema, key: SchemaKey, value: &Value) -> bool {
	let node = &schema[key];
	match (value, &node.type_) {
		(Value::Null, SchemaType::Null)
		| (Value::Boolean(_), SchemaType::Boolean)
		| (Value::Int(_), SchemaType::Int)
		| (Value::Long(_), SchemaType::Long)
		| (Value::Float(_), SchemaType::Float)
		| (Value::Double(_), SchemaType::Double)
		| (Value::Bytes(_), SchemaType::Bytes)
		| (Value::String(_), SchemaType::String)
		| (Value::Array(_), SchemaType::Array(_))
		| (Value::Map(_), SchemaType::Map(_)) => true,
		(Value::Fixed(bytes), SchemaType::Fixed(fixed)) => bytes.len() == fixed.size,
		(Value::Enum(_, symbol), SchemaType::Enum(enum_)) => {
			enum_.symbols.iter().any(|s| s == symbol)
		}
		(Value::Record(entries), SchemaType::Record(record)) => {
			// Record values carry no type name, so the match is structural:
			// every entry is a declared field, and every defaultless field
			// has an entry
			entries
				.iter()
				.all(|(name, _)| record.fields.iter().any(|f| f.name == *name))
				&& record
					.fields
					.iter()
					.all(|f| f.default.is_some() || entries.iter().any(|(name, _)| *name == f.name))
		}
		(Value::Decimal(_), _) => {
			matches!(node.logical_type, Some(LogicalType::Decimal(_)))
		}
		(Value::Duration(_), _) => matches!(node.logical_type, Some(LogicalType::Duration)),
		_ => false,
	}
}

fn variant_matches_lenient(schema: &Schema, key: SchemaKey, value: &Value) -> bool {
	let node = &schema[key];
	match (value, &node.type_) {
		(Value::Int(_), SchemaType::Long)
		| (Value::Int(_), SchemaType::Float)
		| (Value::Int(_), SchemaType::Double)
		| (Value::Long(_), SchemaType::Float)
		| (Value::Long(_), SchemaType::Double)
		| (Value::Float(_), SchemaType::Double)
		| (Value::String(_), SchemaType::Bytes)
		| (Value::Bytes(_), SchemaType::String) => true,
		_ => false,
	}
}

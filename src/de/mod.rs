//! Plan-directed decoding into [`Value`]s
//!
//! A [`ReadPlan`] (compiled from the writer schema, and optionally a
//! different reader schema) drives the decoder. Decode errors are final:
//! there is no resynchronization within a datum.

mod plan;
pub(crate) mod read;

pub use plan::ReadPlan;

use plan::{PlanNode, RecordStep, SymbolMatch, UnionVariant};

use crate::{
	error::{Error, ErrorKind},
	schema::Schema,
	value::{self, Duration, Value},
};

use std::io::Read;

/// Decode a single datum (raw data, no header or framing) from the provided
/// reader
///
/// The [`ReadPlan`] can be reused across datum decodes for performance.
pub fn from_datum<R: Read>(mut reader: R, plan: &ReadPlan) -> Result<Value, Error> {
	decode(plan, plan.root, &mut reader)
}

/// Decode a single datum (raw data, no header or framing) from a slice
///
/// This compiles a fresh identity [`ReadPlan`]; prefer [`from_datum`] with a
/// reused plan when decoding many datums of the same schema.
pub fn from_datum_slice(slice: &[u8], schema: &Schema) -> Result<Value, Error> {
	from_datum(slice, &ReadPlan::new(schema, None)?)
}

pub(crate) fn decode<R: Read>(
	plan: &ReadPlan,
	node: usize,
	reader: &mut R,
) -> Result<Value, Error> {
	Ok(match plan.nodes[node] {
		PlanNode::Null => Value::Null,
		PlanNode::Boolean => Value::Boolean(read::read_bool(reader)?),
		PlanNode::Int => Value::Int(read::read_int(reader)?),
		PlanNode::IntAsLong => Value::Long(read::read_int(reader)?.into()),
		PlanNode::IntAsFloat => Value::Float(read::read_int(reader)? as f32),
		PlanNode::IntAsDouble => Value::Double(read::read_int(reader)?.into()),
		PlanNode::Long => Value::Long(read::read_long(reader)?),
		PlanNode::LongAsFloat => Value::Float(read::read_long(reader)? as f32),
		PlanNode::LongAsDouble => Value::Double(read::read_long(reader)? as f64),
		PlanNode::Float => Value::Float(read::read_float(reader)?),
		PlanNode::FloatAsDouble => Value::Double(read::read_float(reader)?.into()),
		PlanNode::Double => Value::Double(read::read_double(reader)?),
		PlanNode::Bytes | PlanNode::StringAsBytes => {
			let len = read::read_len(reader)?;
			Value::Bytes(read::read_vec(reader, len)?)
		}
		PlanNode::String | PlanNode::BytesAsString => Value::String(read::read_string(reader)?),
		PlanNode::Fixed { size } => Value::Fixed(read::read_vec(reader, size)?),
		PlanNode::Duration => {
			Value::Duration(Duration::from_bytes(read::read_const_size_buf(reader)?))
		}
		PlanNode::Decimal { scale, size } => {
			let unscaled = match size {
				None => {
					let len = read::read_len(reader)?;
					read::read_vec(reader, len)?
				}
				Some(size) => read::read_vec(reader, size)?,
			};
			Value::Decimal(value::decimal_from_big_endian(&unscaled, scale)?)
		}
		PlanNode::Enum { ref symbols } => {
			let position = read::read_len(reader)?;
			match symbols.get(position) {
				Some(SymbolMatch::Found(reader_position, symbol)) => {
					Value::Enum(*reader_position, symbol.clone())
				}
				Some(SymbolMatch::Missing(symbol)) => {
					return Err(Error::msg(
						ErrorKind::EnumSymbolMissing,
						format_args!(
							"Writer enum symbol {symbol:?} is not defined in the reader schema"
						),
					))
				}
				None => {
					return Err(Error::msg(
						ErrorKind::InvalidData,
						format_args!(
							"Enum index {position} is out of range ({} symbols)",
							symbols.len()
						),
					))
				}
			}
		}
		PlanNode::Array { items } => {
			let mut array = Vec::new();
			loop {
				let (count, _) = read::read_block_header(reader)?;
				if count == 0 {
					break;
				}
				array.reserve(count.min(1024 * 1024));
				for _ in 0..count {
					array.push(decode(plan, items, reader)?);
				}
			}
			Value::Array(array)
		}
		PlanNode::Map { values } => {
			let mut map = std::collections::HashMap::new();
			loop {
				let (count, _) = read::read_block_header(reader)?;
				if count == 0 {
					break;
				}
				for _ in 0..count {
					let map_key = read::read_string(reader)?;
					map.insert(map_key, decode(plan, values, reader)?);
				}
			}
			Value::Map(map)
		}
		PlanNode::Record {
			ref steps,
			ref fields,
		} => {
			let mut slots: Vec<Option<Value>> = Vec::new();
			slots.resize_with(fields.len(), || None);
			for step in steps {
				match *step {
					RecordStep::Read { slot, plan: field } => {
						slots[slot] = Some(decode(plan, field, reader)?);
					}
					RecordStep::Skip(field) => skip(plan, field, reader)?,
				}
			}
			Value::Record(
				fields
					.iter()
					.zip(slots)
					.map(|(field, slot)| {
						let field_value = match slot {
							Some(decoded) => decoded,
							None => field
								.default
								.clone()
								.expect("Plan compilation ensures unwritten fields have defaults"),
						};
						(field.name.clone(), field_value)
					})
					.collect(),
			)
		}
		PlanNode::Union { ref variants } => {
			let position = read::read_len(reader)?;
			match variants.get(position) {
				Some(UnionVariant::Plan(variant)) => decode(plan, *variant, reader)?,
				Some(UnionVariant::Incompatible(message)) => {
					return Err(Error::msg(
						ErrorKind::SchemaIncompatible,
						format_args!("{message}"),
					))
				}
				None => {
					return Err(Error::msg(
						ErrorKind::InvalidData,
						format_args!(
							"Union variant index {position} is out of range ({} variants)",
							variants.len()
						),
					))
				}
			}
		}
		PlanNode::IntoUnion { variant, inner } => {
			Value::Union(variant, Box::new(decode(plan, inner, reader)?))
		}
		PlanNode::Placeholder => unreachable!("Placeholder nodes never survive plan compilation"),
	})
}

/// Decode-and-discard, for writer record fields the reader does not have
///
/// Array and map blocks written with the negative-count form carry their
/// byte length, which lets the skip jump over the block without decoding
/// the items.
fn skip<R: Read>(plan: &ReadPlan, node: usize, reader: &mut R) -> Result<(), Error> {
	match plan.nodes[node] {
		PlanNode::Null => {}
		PlanNode::Boolean => {
			read::read_bool(reader)?;
		}
		PlanNode::Int | PlanNode::IntAsLong | PlanNode::IntAsFloat | PlanNode::IntAsDouble => {
			read::read_int(reader)?;
		}
		PlanNode::Long | PlanNode::LongAsFloat | PlanNode::LongAsDouble => {
			read::read_long(reader)?;
		}
		PlanNode::Float | PlanNode::FloatAsDouble => {
			read::read_float(reader)?;
		}
		PlanNode::Double => {
			read::read_double(reader)?;
		}
		PlanNode::Bytes
		| PlanNode::String
		| PlanNode::BytesAsString
		| PlanNode::StringAsBytes
		| PlanNode::Decimal { size: None, .. } => {
			let len = read::read_len(reader)?;
			read::skip_bytes(reader, len as u64)?;
		}
		PlanNode::Fixed { size }
		| PlanNode::Decimal {
			size: Some(size), ..
		} => {
			read::skip_bytes(reader, size as u64)?;
		}
		PlanNode::Duration => {
			read::skip_bytes(reader, 12)?;
		}
		PlanNode::Enum { .. } => {
			read::read_len(reader)?;
		}
		PlanNode::Array { items } => skip_blocks(plan, items, reader, false)?,
		PlanNode::Map { values } => skip_blocks(plan, values, reader, true)?,
		PlanNode::Record { ref steps, .. } => {
			for step in steps {
				match *step {
					RecordStep::Read { plan: field, .. } | RecordStep::Skip(field) => {
						skip(plan, field, reader)?
					}
				}
			}
		}
		PlanNode::Union { ref variants } => {
			let position = read::read_len(reader)?;
			match variants.get(position) {
				Some(UnionVariant::Plan(variant)) => skip(plan, *variant, reader)?,
				Some(UnionVariant::Incompatible(_)) | None => {
					return Err(Error::msg(
						ErrorKind::InvalidData,
						format_args!("Union variant index {position} cannot be skipped"),
					))
				}
			}
		}
		PlanNode::IntoUnion { inner, .. } => skip(plan, inner, reader)?,
		PlanNode::Placeholder => unreachable!("Placeholder nodes never survive plan compilation"),
	}
	Ok(())
}

fn skip_blocks<R: Read>(
	plan: &ReadPlan,
	element: usize,
	reader: &mut R,
	keyed: bool,
) -> Result<(), Error> {
	loop {
		let (count, byte_len) = read::read_block_header(reader)?;
		if count == 0 {
			return Ok(());
		}
		match byte_len {
			// The writer provided the block byte length for exactly this
			// purpose
			Some(byte_len) => read::skip_bytes(reader, byte_len)?,
			None => {
				for _ in 0..count {
					if keyed {
						let len = read::read_len(reader)?;
						read::skip_bytes(reader, len as u64)?;
					}
					skip(plan, element, reader)?;
				}
			}
		}
	}
}

use crate::schema::{fingerprint::Crc64Avro, *};

use std::fmt::Write;

impl Schema {
	/// Obtain the CRC-64-AVRO (Rabin) fingerprint of the schema
	///
	/// The fingerprint is computed over the [parsing canonical form](https://avro.apache.org/docs/current/specification/#parsing-canonical-form-for-schemas)
	/// of the schema, and is returned as the 8-byte little-endian encoding of
	/// the hash.
	pub fn canonical_form_fingerprint(&self) -> Result<[u8; 8], SchemaError> {
		let mut state = WriteCanonicalFormState {
			w: ErrorConversionWriter(Crc64Avro::default()),
			named_type_written: vec![false; self.nodes.len()],
		};
		state.write_canonical_form(self, SchemaKey::from_idx(0))?;
		Ok(state.w.0.finish())
	}

	/// Obtain the parsing canonical form of the schema
	///
	/// Note that per the reference implementation this is not guaranteed to
	/// be valid JSON (names are not escaped), and it loses logical type
	/// information, so it should only be used for fingerprinting, not for
	/// transmitting the schema (use [`json`](Schema::json) for that).
	pub fn canonical_form(&self) -> Result<String, SchemaError> {
		let mut state = WriteCanonicalFormState {
			w: ErrorConversionWriter(String::new()),
			named_type_written: vec![false; self.nodes.len()],
		};
		state.write_canonical_form(self, SchemaKey::from_idx(0))?;
		Ok(state.w.0)
	}
}

struct WriteCanonicalFormState<W> {
	w: ErrorConversionWriter<W>,
	named_type_written: Vec<bool>,
}

impl<W: Write> WriteCanonicalFormState<W> {
	/// Manual implementation that strictly copies that of the reference
	/// implementation in Java
	fn write_canonical_form(
		&mut self,
		schema: &Schema,
		key: SchemaKey,
	) -> Result<(), SchemaError> {
		let node = schema
			.get(key)
			.ok_or_else(|| SchemaError::new("SchemaKey refers to non-existing node"))?;

		// In the parsing canonical form, logical types are ignored entirely

		let mut first_time = true;
		let should_not_write_only_name = |name: &Name,
		                                  state: &mut WriteCanonicalFormState<W>|
		 -> Result<bool, SchemaError> {
			Ok(match &mut state.named_type_written[key.idx] {
				b @ false => {
					*b = true;
					true
				}
				true => {
					state.w.write_char('"')?;
					state.w.write_str(name.fully_qualified_name())?;
					state.w.write_char('"')?;
					false
				}
			})
		};

		match node.type_ {
			SchemaType::Null => {
				self.w.write_str("\"null\"")?;
			}
			SchemaType::Boolean => {
				self.w.write_str("\"boolean\"")?;
			}
			SchemaType::Bytes => {
				self.w.write_str("\"bytes\"")?;
			}
			SchemaType::Double => {
				self.w.write_str("\"double\"")?;
			}
			SchemaType::Float => {
				self.w.write_str("\"float\"")?;
			}
			SchemaType::Int => {
				self.w.write_str("\"int\"")?;
			}
			SchemaType::Long => {
				self.w.write_str("\"long\"")?;
			}
			SchemaType::String => {
				self.w.write_str("\"string\"")?;
			}
			SchemaType::Union(ref union) => {
				self.w.write_char('[')?;
				for &variant in &union.variants {
					if !first_time {
						self.w.write_char(',')?;
					} else {
						first_time = false;
					}
					self.write_canonical_form(schema, variant)?;
				}
				self.w.write_char(']')?;
			}
			SchemaType::Array(ref array) => {
				self.w.write_str("{\"type\":\"array\",\"items\":")?;
				self.write_canonical_form(schema, array.items)?;
				self.w.write_char('}')?;
			}
			SchemaType::Map(ref map) => {
				self.w.write_str("{\"type\":\"map\",\"values\":")?;
				self.write_canonical_form(schema, map.values)?;
				self.w.write_char('}')?;
			}
			SchemaType::Enum(ref enum_) => {
				if should_not_write_only_name(&enum_.name, self)? {
					self.w.write_str("{\"name\":\"")?;
					self.w.write_str(enum_.name.fully_qualified_name())?;
					self.w.write_str("\",\"type\":\"enum\",\"symbols\":[")?;
					for enum_symbol in enum_.symbols.iter() {
						if !first_time {
							self.w.write_char(',')?;
						} else {
							first_time = false;
						}
						self.w.write_char('"')?;
						self.w.write_str(enum_symbol)?;
						self.w.write_char('"')?;
					}
					self.w.write_char(']')?;
					self.w.write_char('}')?;
				}
			}
			SchemaType::Fixed(ref fixed) => {
				if should_not_write_only_name(&fixed.name, self)? {
					self.w.write_str("{\"name\":\"")?;
					self.w.write_str(fixed.name.fully_qualified_name())?;
					self.w.write_str("\",\"type\":\"fixed\",\"size\":")?;
					write!(self.w.0, "{}", fixed.size).map_err(convert_error)?;
					self.w.write_char('}')?;
				}
			}
			SchemaType::Record(ref record) => {
				if should_not_write_only_name(&record.name, self)? {
					self.w.write_str("{\"name\":\"")?;
					self.w.write_str(record.name.fully_qualified_name())?;
					self.w.write_str("\",\"type\":\"record\",\"fields\":[")?;
					for field in record.fields.iter() {
						if !first_time {
							self.w.write_char(',')?;
						} else {
							first_time = false;
						}
						self.w.write_str("{\"name\":\"")?;
						self.w.write_str(&field.name)?;
						self.w.write_str("\",\"type\":")?;
						self.write_canonical_form(schema, field.type_)?;
						self.w.write_char('}')?;
					}
					self.w.write_str("]}")?;
				}
			}
		}
		Ok(())
	}
}

/// Convert errors from `std::fmt::Write` to `SchemaError`
/// in order to be able to use `?` in `WriteCanonicalFormState`
struct ErrorConversionWriter<W>(W);
impl<W: Write> ErrorConversionWriter<W> {
	#[inline]
	fn write_char(&mut self, c: char) -> Result<(), SchemaError> {
		self.0.write_char(c).map_err(convert_error)
	}
	#[inline]
	fn write_str(&mut self, s: &str) -> Result<(), SchemaError> {
		self.0.write_str(s).map_err(convert_error)
	}
}
fn convert_error(e: std::fmt::Error) -> SchemaError {
	SchemaError::msg(format_args!(
		"Error writing schema parsing canonical form: {}",
		e,
	))
}

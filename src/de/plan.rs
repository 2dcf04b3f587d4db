//! Resolution of a writer schema against a reader schema
//!
//! A [`ReadPlan`] is compiled once per writer/reader schema pair and drives
//! the decoder: it is a flat graph mirroring the writer schema, with every
//! node annotated with how the decoded value must be produced for the reader
//! (as-is, promoted, skipped, defaulted, wrapped into a union variant...).
//! When no reader schema is given the plan resolves the writer schema
//! against itself, which compiles to the identity plan.
//!
//! Compilation is memoized on (writer node, reader node) pairs, so cyclic
//! schemas compile to cyclic plans and terminate.

use crate::{
	error::{Error, ErrorKind},
	schema::{LogicalType, Schema, SchemaKey, SchemaType},
	value::{self, Value},
};

use std::collections::HashMap;

/// A compiled decoding plan for data written with one schema and read with
/// another (or the same) schema
#[derive(Debug)]
pub struct ReadPlan {
	pub(crate) nodes: Vec<PlanNode>,
	pub(crate) root: usize,
}

impl ReadPlan {
	/// Compile a plan for decoding data written with `writer`
	///
	/// If `reader` is provided and differs from `writer`, Avro schema
	/// resolution applies: numeric promotions, `string`/`bytes` crossover,
	/// record fields matched by name (writer-only fields are skipped,
	/// reader-only fields take their default), enums matched by symbol, and
	/// unions resolved variant by variant.
	pub fn new(writer: &Schema, reader: Option<&Schema>) -> Result<Self, Error> {
		let mut builder = PlanBuilder {
			writer,
			reader: reader.unwrap_or(writer),
			nodes: Vec::new(),
			memo: HashMap::new(),
			skip_memo: HashMap::new(),
		};
		let root = builder.resolve(writer.root_key(), builder.reader.root_key())?;
		Ok(Self {
			nodes: builder.nodes,
			root,
		})
	}
}

#[derive(Debug)]
pub(crate) enum PlanNode {
	Null,
	Boolean,
	Int,
	Long,
	Float,
	Double,
	Bytes,
	String,
	/// Numeric promotion, `writer type As reader type`
	IntAsLong,
	IntAsFloat,
	IntAsDouble,
	LongAsFloat,
	LongAsDouble,
	FloatAsDouble,
	BytesAsString,
	StringAsBytes,
	Fixed {
		size: usize,
	},
	/// `fixed(12)` annotated as a duration: unpacked into months, days and
	/// milliseconds on read
	Duration,
	/// `bytes` or `fixed` annotated as a decimal: converted from the
	/// unscaled two's-complement big-endian integer on read
	Decimal {
		scale: u32,
		/// `None` over `bytes` (length-prefixed), `Some` over `fixed`
		size: Option<usize>,
	},
	Enum {
		symbols: Vec<SymbolMatch>,
	},
	Array {
		items: usize,
	},
	Map {
		values: usize,
	},
	Record {
		/// What to do with each writer field, in writer declaration order
		steps: Vec<RecordStep>,
		/// The reader's fields, in reader declaration order
		fields: Vec<ReaderField>,
	},
	/// Decode the variant index against the writer union, then follow that
	/// variant's plan
	Union {
		variants: Vec<UnionVariant>,
	},
	/// Wrap the decoded value into the reader union variant at `variant`
	IntoUnion {
		variant: usize,
		inner: usize,
	},
	/// Reserved slot while the plan for a node pair is being compiled
	Placeholder,
}

#[derive(Debug)]
pub(crate) enum SymbolMatch {
	/// Writer symbol present in the reader: reader position and symbol
	Found(usize, String),
	/// Writer symbol absent from the reader: fails with
	/// [`EnumSymbolMissing`](ErrorKind::EnumSymbolMissing) if encountered
	Missing(String),
}

#[derive(Debug)]
pub(crate) enum RecordStep {
	/// Decode the writer field into the reader field slot
	Read { slot: usize, plan: usize },
	/// The reader has no such field: decode and discard
	Skip(usize),
}

#[derive(Debug)]
pub(crate) struct ReaderField {
	pub(crate) name: String,
	/// Instantiated default, present iff the writer does not provide the
	/// field
	pub(crate) default: Option<Value>,
}

#[derive(Debug)]
pub(crate) enum UnionVariant {
	Plan(usize),
	/// This writer variant cannot be resolved against the reader schema:
	/// fails with [`SchemaIncompatible`](ErrorKind::SchemaIncompatible) if
	/// encountered
	Incompatible(String),
}

struct PlanBuilder<'s> {
	writer: &'s Schema,
	reader: &'s Schema,
	nodes: Vec<PlanNode>,
	memo: HashMap<(usize, usize), usize>,
	skip_memo: HashMap<usize, usize>,
}

impl<'s> PlanBuilder<'s> {
	fn resolve(&mut self, w: SchemaKey, r: SchemaKey) -> Result<usize, Error> {
		if let Some(&idx) = self.memo.get(&(w.idx(), r.idx())) {
			return Ok(idx);
		}
		let idx = self.nodes.len();
		self.nodes.push(PlanNode::Placeholder);
		self.memo.insert((w.idx(), r.idx()), idx);
		let node = self.resolve_node(w, r)?;
		self.nodes[idx] = node;
		Ok(idx)
	}

	fn resolve_node(&mut self, w: SchemaKey, r: SchemaKey) -> Result<PlanNode, Error> {
		let writer_node = &self.writer[w];
		let reader_node = &self.reader[r];

		if let SchemaType::Union(ref writer_union) = writer_node.type_ {
			// The variant index on the wire is the writer's; each writer
			// variant resolves independently against the reader schema.
			// Variants that cannot possibly match only fail if encountered.
			let variants = writer_union
				.variants
				.iter()
				.map(|&wv| {
					if self.reader_can_match(wv, r) {
						Ok(UnionVariant::Plan(self.resolve(wv, r)?))
					} else {
						Ok(UnionVariant::Incompatible(format!(
							"Writer union variant {} cannot be resolved against reader schema",
							self.writer[wv].type_.type_name(),
						)))
					}
				})
				.collect::<Result<_, Error>>()?;
			return Ok(PlanNode::Union { variants });
		}

		if let SchemaType::Union(ref reader_union) = reader_node.type_ {
			// Writer is not a union but reader is: decode as the first
			// matching reader variant
			let (variant, rv) = reader_union
				.variants
				.iter()
				.copied()
				.enumerate()
				.find(|&(_, rv)| self.shallow_match(w, rv))
				.ok_or_else(|| {
					Error::msg(
						ErrorKind::SchemaIncompatible,
						format_args!(
							"No reader union variant matches writer {} schema",
							writer_node.type_.type_name()
						),
					)
				})?;
			return Ok(PlanNode::IntoUnion {
				variant,
				inner: self.resolve(w, rv)?,
			});
		}

		let incompatible = || {
			Err(Error::msg(
				ErrorKind::SchemaIncompatible,
				format_args!(
					"Writer {} schema cannot be resolved against reader {} schema",
					writer_node.type_.type_name(),
					reader_node.type_.type_name()
				),
			))
		};

		Ok(match (&writer_node.type_, &reader_node.type_) {
			(SchemaType::Null, SchemaType::Null) => PlanNode::Null,
			(SchemaType::Boolean, SchemaType::Boolean) => PlanNode::Boolean,
			(SchemaType::Int, SchemaType::Int) => PlanNode::Int,
			(SchemaType::Int, SchemaType::Long) => PlanNode::IntAsLong,
			(SchemaType::Int, SchemaType::Float) => PlanNode::IntAsFloat,
			(SchemaType::Int, SchemaType::Double) => PlanNode::IntAsDouble,
			(SchemaType::Long, SchemaType::Long) => PlanNode::Long,
			(SchemaType::Long, SchemaType::Float) => PlanNode::LongAsFloat,
			(SchemaType::Long, SchemaType::Double) => PlanNode::LongAsDouble,
			(SchemaType::Float, SchemaType::Float) => PlanNode::Float,
			(SchemaType::Float, SchemaType::Double) => PlanNode::FloatAsDouble,
			(SchemaType::Double, SchemaType::Double) => PlanNode::Double,
			(SchemaType::Bytes, SchemaType::Bytes) => match reader_node.logical_type {
				Some(LogicalType::Decimal(ref decimal)) => PlanNode::Decimal {
					scale: decimal.scale,
					size: None,
				},
				_ => PlanNode::Bytes,
			},
			(SchemaType::Bytes, SchemaType::String) => PlanNode::BytesAsString,
			(SchemaType::String, SchemaType::String) => PlanNode::String,
			(SchemaType::String, SchemaType::Bytes) => PlanNode::StringAsBytes,
			(SchemaType::Fixed(writer_fixed), SchemaType::Fixed(reader_fixed)) => {
				if writer_fixed.name != reader_fixed.name
					|| writer_fixed.size != reader_fixed.size
				{
					return Err(Error::msg(
						ErrorKind::SchemaIncompatible,
						format_args!(
							"Fixed schemas must match exactly: writer has {} ({} bytes), \
								reader has {} ({} bytes)",
							writer_fixed.name.fully_qualified_name(),
							writer_fixed.size,
							reader_fixed.name.fully_qualified_name(),
							reader_fixed.size
						),
					));
				}
				match reader_node.logical_type {
					Some(LogicalType::Duration) => PlanNode::Duration,
					Some(LogicalType::Decimal(ref decimal)) => PlanNode::Decimal {
						scale: decimal.scale,
						size: Some(reader_fixed.size),
					},
					_ => PlanNode::Fixed {
						size: reader_fixed.size,
					},
				}
			}
			(SchemaType::Array(writer_array), SchemaType::Array(reader_array)) => {
				PlanNode::Array {
					items: self.resolve(writer_array.items, reader_array.items)?,
				}
			}
			(SchemaType::Map(writer_map), SchemaType::Map(reader_map)) => PlanNode::Map {
				values: self.resolve(writer_map.values, reader_map.values)?,
			},
			(SchemaType::Enum(writer_enum), SchemaType::Enum(reader_enum)) => PlanNode::Enum {
				symbols: writer_enum
					.symbols
					.iter()
					.map(|symbol| {
						match reader_enum.symbols.iter().position(|s| s == symbol) {
							Some(position) => SymbolMatch::Found(position, symbol.clone()),
							None => SymbolMatch::Missing(symbol.clone()),
						}
					})
					.collect(),
			},
			(SchemaType::Record(writer_record), SchemaType::Record(reader_record)) => {
				let fields = reader_record
					.fields
					.iter()
					.map(|reader_field| {
						let written = writer_record
							.fields
							.iter()
							.any(|f| f.name == reader_field.name);
						Ok(ReaderField {
							name: reader_field.name.clone(),
							default: match (written, &reader_field.default) {
								(true, _) => None,
								(false, Some(default)) => Some(value::value_from_default(
									self.reader,
									reader_field.type_,
									default,
								)?),
								(false, None) => {
									return Err(Error::msg(
										ErrorKind::SchemaIncompatible,
										format_args!(
											"Reader field {}.{} is not written and has no default",
											reader_record.name.fully_qualified_name(),
											reader_field.name
										),
									))
								}
							},
						})
					})
					.collect::<Result<Vec<_>, Error>>()?;
				let steps = writer_record
					.fields
					.iter()
					.map(|writer_field| {
						Ok(
							match reader_record
								.fields
								.iter()
								.position(|f| f.name == writer_field.name)
							{
								Some(slot) => RecordStep::Read {
									slot,
									plan: self.resolve(
										writer_field.type_,
										reader_record.fields[slot].type_,
									)?,
								},
								None => RecordStep::Skip(self.skip(writer_field.type_)),
							},
						)
					})
					.collect::<Result<_, Error>>()?;
				PlanNode::Record { steps, fields }
			}
			_ => return incompatible(),
		})
	}

	/// Whether this writer schema could resolve against the reader schema
	/// (which may be a union), without compiling anything
	fn reader_can_match(&self, w: SchemaKey, r: SchemaKey) -> bool {
		match self.reader[r].type_ {
			SchemaType::Union(ref reader_union) => reader_union
				.variants
				.iter()
				.any(|&rv| self.shallow_match(w, rv)),
			_ => self.shallow_match(w, r),
		}
	}

	/// Type-tag level compatibility, used to pick union variants: exact tag,
	/// numeric promotion, `string`/`bytes` crossover, named types by fully
	/// qualified name
	fn shallow_match(&self, w: SchemaKey, r: SchemaKey) -> bool {
		match (&self.writer[w].type_, &self.reader[r].type_) {
			(SchemaType::Null, SchemaType::Null)
			| (SchemaType::Boolean, SchemaType::Boolean)
			| (SchemaType::Int, SchemaType::Int | SchemaType::Long | SchemaType::Float | SchemaType::Double)
			| (SchemaType::Long, SchemaType::Long | SchemaType::Float | SchemaType::Double)
			| (SchemaType::Float, SchemaType::Float | SchemaType::Double)
			| (SchemaType::Double, SchemaType::Double)
			| (SchemaType::Bytes, SchemaType::Bytes | SchemaType::String)
			| (SchemaType::String, SchemaType::String | SchemaType::Bytes)
			| (SchemaType::Array(_), SchemaType::Array(_))
			| (SchemaType::Map(_), SchemaType::Map(_)) => true,
			(SchemaType::Record(writer_record), SchemaType::Record(reader_record)) => {
				writer_record.name == reader_record.name
			}
			(SchemaType::Enum(writer_enum), SchemaType::Enum(reader_enum)) => {
				writer_enum.name == reader_enum.name
			}
			(SchemaType::Fixed(writer_fixed), SchemaType::Fixed(reader_fixed)) => {
				writer_fixed.name == reader_fixed.name && writer_fixed.size == reader_fixed.size
			}
			_ => false,
		}
	}

	/// Compile a writer-only subtree (a record field the reader does not
	/// have) into an identity plan, used for decode-and-discard
	fn skip(&mut self, w: SchemaKey) -> usize {
		if let Some(&idx) = self.skip_memo.get(&w.idx()) {
			return idx;
		}
		let idx = self.nodes.len();
		self.nodes.push(PlanNode::Placeholder);
		self.skip_memo.insert(w.idx(), idx);
		let node = match self.writer[w].type_ {
			SchemaType::Null => PlanNode::Null,
			SchemaType::Boolean => PlanNode::Boolean,
			SchemaType::Int => PlanNode::Int,
			SchemaType::Long => PlanNode::Long,
			SchemaType::Float => PlanNode::Float,
			SchemaType::Double => PlanNode::Double,
			SchemaType::Bytes => PlanNode::Bytes,
			SchemaType::String => PlanNode::String,
			SchemaType::Fixed(ref fixed) => PlanNode::Fixed { size: fixed.size },
			SchemaType::Enum(ref enum_) => PlanNode::Enum {
				symbols: enum_
					.symbols
					.iter()
					.enumerate()
					.map(|(position, symbol)| SymbolMatch::Found(position, symbol.clone()))
					.collect(),
			},
			SchemaType::Array(ref array) => PlanNode::Array {
				items: self.skip(array.items),
			},
			SchemaType::Map(ref map) => PlanNode::Map {
				values: self.skip(map.values),
			},
			SchemaType::Union(ref union) => PlanNode::Union {
				variants: union
					.variants
					.iter()
					.map(|&wv| UnionVariant::Plan(self.skip(wv)))
					.collect(),
			},
			SchemaType::Record(ref record) => PlanNode::Record {
				steps: record
					.fields
					.iter()
					.map(|field| RecordStep::Skip(self.skip(field.type_)))
					.collect(),
				fields: Vec::new(),
			},
		};
		self.nodes[idx] = node;
		idx
	}
}

//! Navigate, compare and initialize the [`Schema`]

mod canonical_form;
mod equality;
mod error;
mod fingerprint;
mod parsing;
mod serialize;

pub use error::SchemaError;

/// An Avro schema
///
/// Obtained by parsing schema JSON:
/// ```
/// let schema: avro_container::Schema = r#"{
/// 	"type": "record",
/// 	"name": "Pair",
/// 	"fields": [
/// 		{ "name": "left", "type": "long" },
/// 		{ "name": "right", "type": "long" }
/// 	]
/// }"#
/// .parse()
/// .expect("Failed to parse schema");
/// assert!(matches!(
/// 	schema.root().type_,
/// 	avro_container::schema::SchemaType::Record(_)
/// ));
/// ```
///
/// Internally this is not a tree but a possibly-cyclic directed graph: due to
/// how [names](https://avro.apache.org/docs/current/specification/#names) work
/// in Avro, a record may reference itself (or any previously defined named
/// type) through its fully qualified name. Nodes are owned by a flat table
/// and reference each other through [`SchemaKey`]s, so such cycles do not
/// require any shared-ownership gymnastics.
///
/// Schemas are immutable once parsed and may be freely shared across threads.
#[derive(Clone, Debug)]
pub struct Schema {
	// First node of the table is the root of the schema
	pub(crate) nodes: Vec<SchemaNode>,
}

impl Schema {
	/// Obtain the underlying node table
	///
	/// The first node (index `0`) is the root of the schema.
	/// [`SchemaKey`]s convert to indexes of this slice.
	pub fn nodes(&self) -> &[SchemaNode] {
		&self.nodes
	}

	/// Obtain the root node of the schema
	pub fn root(&self) -> &SchemaNode {
		&self.nodes[0]
	}

	/// Obtain the key of the root node of the schema
	pub fn root_key(&self) -> SchemaKey {
		SchemaKey::from_idx(0)
	}

	/// Try to get the node at the given [`SchemaKey`]
	///
	/// (or return `None` if the key is invalid)
	///
	/// If you want to panic on invalid keys, use `schema[key]` instead.
	pub fn get(&self, key: SchemaKey) -> Option<&SchemaNode> {
		self.nodes.get(key.idx)
	}
}

impl std::ops::Index<SchemaKey> for Schema {
	type Output = SchemaNode;
	fn index(&self, key: SchemaKey) -> &Self::Output {
		&self.nodes[key.idx]
	}
}

/// The location of a node in a [`Schema`]
///
/// This can be used to [`Index`](std::ops::Index) into the [`Schema`].
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemaKey {
	pub(crate) idx: usize,
}

impl SchemaKey {
	pub(crate) const fn from_idx(idx: usize) -> Self {
		Self { idx }
	}
	/// Obtain the index in the [`nodes`](Schema::nodes) slice that this
	/// [`SchemaKey`] points to
	pub const fn idx(self) -> usize {
		self.idx
	}
}
impl std::fmt::Debug for SchemaKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		std::fmt::Debug::fmt(&self.idx, f)
	}
}

/// A node of an Avro schema, stored in a [`Schema`]
///
/// References to other nodes are represented as [`SchemaKey`]s, which index
/// into the [`Schema`]'s node table.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct SchemaNode {
	/// The underlying regular type of this node
	pub type_: SchemaType,
	/// Logical type that the regular type is annotated with, if any
	///
	/// An unrecognized logical type name, or a logical type whose base type
	/// or parameters are invalid, parses as `None`: the node degrades to its
	/// regular type.
	pub logical_type: Option<LogicalType>,
}

/// A primitive or complex type of an Avro schema, stored in a [`SchemaNode`]
#[derive(Clone, Debug)]
pub enum SchemaType {
	/// A `null` Avro schema
	Null,
	/// A `boolean` Avro schema
	Boolean,
	/// An `int` Avro schema
	Int,
	/// A `long` Avro schema
	Long,
	/// A `float` Avro schema
	Float,
	/// A `double` Avro schema
	Double,
	/// A `bytes` Avro schema, a sequence of 8-bit unsigned bytes
	Bytes,
	/// A `string` Avro schema, a unicode character sequence
	String,
	/// An `array` Avro schema. All elements share the `items` schema.
	Array(Array),
	/// A `map` Avro schema. Keys are assumed to be `string`, all values
	/// share the `values` schema.
	Map(Map),
	/// A `union` Avro schema
	Union(Union),
	/// A `record` Avro schema
	Record(Record),
	/// An `enum` Avro schema
	Enum(Enum),
	/// A `fixed` Avro schema
	Fixed(Fixed),
}

impl SchemaType {
	/// If the type is a named type, returns the name of the type
	pub fn name(&self) -> Option<&Name> {
		match self {
			SchemaType::Record(record) => Some(&record.name),
			SchemaType::Enum(enum_) => Some(&enum_.name),
			SchemaType::Fixed(fixed) => Some(&fixed.name),
			SchemaType::Null
			| SchemaType::Boolean
			| SchemaType::Int
			| SchemaType::Long
			| SchemaType::Float
			| SchemaType::Double
			| SchemaType::Bytes
			| SchemaType::String
			| SchemaType::Array(_)
			| SchemaType::Map(_)
			| SchemaType::Union(_) => None,
		}
	}

	/// The Avro name of the type, as it would appear in a `type` JSON field
	pub(crate) fn type_name(&self) -> &'static str {
		match self {
			SchemaType::Null => "null",
			SchemaType::Boolean => "boolean",
			SchemaType::Int => "int",
			SchemaType::Long => "long",
			SchemaType::Float => "float",
			SchemaType::Double => "double",
			SchemaType::Bytes => "bytes",
			SchemaType::String => "string",
			SchemaType::Array(_) => "array",
			SchemaType::Map(_) => "map",
			SchemaType::Union(_) => "union",
			SchemaType::Record(_) => "record",
			SchemaType::Enum(_) => "enum",
			SchemaType::Fixed(_) => "fixed",
		}
	}
}

/// Component of a [`Schema`]
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct Array {
	/// The key of the schema of each item that will be in the array
	pub items: SchemaKey,
}

/// Component of a [`Schema`]
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct Map {
	/// The key of the schema of each value that will be in the map
	///
	/// In an Avro map, all keys are strings.
	pub values: SchemaKey,
}

/// Component of a [`Schema`]
///
/// Each variant of the union is one of the `variants` keys. At most one
/// variant of each primitive type, one `array`, one `map`, and any number of
/// distinct named types may appear; unions may not directly contain unions.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct Union {
	/// The keys of the schemas of each variant of this union
	pub variants: Vec<SchemaKey>,
}

/// Component of a [`Schema`]
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct Record {
	/// The name of the record (including namespace)
	pub name: Name,
	/// Alternate names this record is known under
	pub aliases: Vec<String>,
	/// Documentation string carried by the schema
	pub doc: Option<String>,
	/// The ordered list of fields in this record
	pub fields: Vec<RecordField>,
}

/// Component of a [`Schema`]
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct RecordField {
	/// Name of the field, unique within its record
	pub name: String,
	/// Documentation string carried by the schema
	pub doc: Option<String>,
	/// Default value of the field, as schema-JSON
	///
	/// This is what a reader uses when its schema declares a field the
	/// writer's schema does not have.
	pub default: Option<serde_json::Value>,
	/// The key of the schema of the type of this field
	pub type_: SchemaKey,
}

/// Component of a [`Schema`]
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct Enum {
	/// The name of the enum (including namespace)
	pub name: Name,
	/// Alternate names this enum is known under
	pub aliases: Vec<String>,
	/// The symbols of the enum, encoded on the wire by their position
	pub symbols: Vec<String>,
}

/// Component of a [`Schema`]
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct Fixed {
	/// The name of the *fixed* type (including namespace)
	pub name: Name,
	/// Alternate names this fixed is known under
	pub aliases: Vec<String>,
	/// The size in bytes of every value of this type
	pub size: usize,
}

/// Schema component for named nodes of a [`Schema`]
///
/// This holds both the "name" and the "namespace".
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Name {
	fully_qualified_name: String,
	namespace_delimiter_idx: Option<usize>,
}

impl std::fmt::Debug for Name {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		std::fmt::Debug::fmt(&self.fully_qualified_name, f)
	}
}

impl Name {
	/// The rightmost component of the fully qualified name
	///
	/// e.g. in `a.b.c` it's `c`
	pub fn name(&self) -> &str {
		match self.namespace_delimiter_idx {
			None => &self.fully_qualified_name,
			Some(delimiter_idx) => &self.fully_qualified_name[delimiter_idx + 1..],
		}
	}

	/// The namespace component of the fully qualified name
	///
	/// e.g. in `a.b.c` it's `a.b`
	pub fn namespace(&self) -> Option<&str> {
		self.namespace_delimiter_idx
			.map(|idx| &self.fully_qualified_name[..idx])
	}

	/// The fully qualified name, e.g. `a.b.c`
	pub fn fully_qualified_name(&self) -> &str {
		&self.fully_qualified_name
	}

	pub(crate) fn from_parts(namespace: Option<&str>, name: &str) -> Self {
		match namespace {
			None => Name {
				fully_qualified_name: name.to_owned(),
				namespace_delimiter_idx: None,
			},
			Some(namespace) => Name {
				fully_qualified_name: format!("{}.{}", namespace, name),
				namespace_delimiter_idx: Some(namespace.len()),
			},
		}
	}
}

/// Logical type
///
/// A logical type annotates a base schema with an interpretation, without
/// changing the wire encoding.
///
/// <https://avro.apache.org/docs/current/specification/#logical-types>
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum LogicalType {
	/// An arbitrary-precision signed decimal number, stored as its unscaled
	/// two's-complement big-endian integer over `bytes` or `fixed`
	Decimal(Decimal),
	/// A universally unique identifier, annotating a `string`
	Uuid,
	/// A number of days since the unix epoch, annotating an `int`
	Date,
	/// The time of day in milliseconds after midnight, annotating an `int`
	TimeMillis,
	/// The time of day in microseconds after midnight, annotating a `long`
	TimeMicros,
	/// An instant in milliseconds since the unix epoch, annotating a `long`
	TimestampMillis,
	/// An instant in microseconds since the unix epoch, annotating a `long`
	TimestampMicros,
	/// An amount of time defined by months, days and milliseconds,
	/// annotating a `fixed` of size 12
	Duration,
}

/// Component of a [`Schema`]
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct Decimal {
	/// The number of significant digits
	pub precision: usize,
	/// The number of digits to the right of the decimal point
	pub scale: u32,
}

impl LogicalType {
	/// The name of the logical type, as it appears in the schema JSON
	pub fn as_str(&self) -> &str {
		match self {
			LogicalType::Decimal(_) => "decimal",
			LogicalType::Uuid => "uuid",
			LogicalType::Date => "date",
			LogicalType::TimeMillis => "time-millis",
			LogicalType::TimeMicros => "time-micros",
			LogicalType::TimestampMillis => "timestamp-millis",
			LogicalType::TimestampMicros => "timestamp-micros",
			LogicalType::Duration => "duration",
		}
	}
}

mod raw;

use crate::schema::*;

use std::collections::{HashMap, HashSet};

const LATE_NAME_LOOKUP_REMAP_BIT: usize = 1usize << (usize::BITS - 1);

struct SchemaConstructionState<'a> {
	nodes: Vec<SchemaNode>,
	names: HashMap<NameKey<'a>, usize>,
	unresolved_names: Vec<NameKey<'a>>,
}

impl std::str::FromStr for Schema {
	type Err = SchemaError;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let mut state = SchemaConstructionState {
			nodes: Vec::new(),
			names: HashMap::new(),
			unresolved_names: Vec::new(),
		};

		let raw_schema: raw::SchemaNode = serde_json::from_str(s).map_err(SchemaError::serde_json)?;

		state.register_node(&raw_schema, None)?;

		// Support for unordered name definitions
		if !state.unresolved_names.is_empty() {
			let resolved_names: Vec<SchemaKey> = state
				.unresolved_names
				.into_iter()
				.map(|name| {
					state
						.names
						.get(&name)
						.ok_or(SchemaError::msg(format_args!(
							"The Schema contains an unknown reference: {}",
							name,
						)))
						.map(|&idx| SchemaKey { idx })
				})
				.collect::<Result<_, _>>()?;
			let fix_key = |key: &mut SchemaKey| {
				if key.idx & LATE_NAME_LOOKUP_REMAP_BIT != 0 {
					*key = resolved_names[key.idx ^ LATE_NAME_LOOKUP_REMAP_BIT];
				}
			};
			for schema_node in &mut state.nodes {
				match schema_node.type_ {
					SchemaType::Array(Array { ref mut items }) => fix_key(items),
					SchemaType::Map(Map { ref mut values }) => fix_key(values),
					SchemaType::Union(ref mut union) => {
						union.variants.iter_mut().for_each(fix_key)
					}
					SchemaType::Record(ref mut record) => {
						record.fields.iter_mut().for_each(|f| fix_key(&mut f.type_))
					}
					SchemaType::Null
					| SchemaType::Boolean
					| SchemaType::Int
					| SchemaType::Long
					| SchemaType::Float
					| SchemaType::Double
					| SchemaType::Bytes
					| SchemaType::String
					| SchemaType::Enum(_)
					| SchemaType::Fixed(_) => {}
				}
			}
		}

		let mut schema = Self { nodes: state.nodes };
		validate_unions(&schema)?;
		degrade_invalid_logical_types(&mut schema);
		check_for_unconditional_cycles(&schema)?;
		Ok(schema)
	}
}

impl<'a> SchemaConstructionState<'a> {
	fn register_node(
		&mut self,
		raw_schema: &'a raw::SchemaNode<'a>,
		enclosing_namespace: Option<&'a str>,
	) -> Result<SchemaKey, SchemaError> {
		Ok(match *raw_schema {
			raw::SchemaNode::Type(type_) => {
				let idx = self.nodes.len();
				self.nodes.push(SchemaNode {
					type_: primitive_type(type_)?,
					logical_type: None,
				});
				SchemaKey { idx }
			}
			raw::SchemaNode::Object(ref object) => self.register_object(object, enclosing_namespace)?,
			raw::SchemaNode::Union(ref union_schemas) => {
				let idx = self.nodes.len();
				// Reserve the spot for us
				self.nodes.push(SchemaNode {
					type_: SchemaType::Null,
					logical_type: None,
				});
				let new_node = SchemaNode {
					type_: SchemaType::Union(Union {
						variants: union_schemas
							.iter()
							.map(|schema| self.register_node(schema, enclosing_namespace))
							.collect::<Result<_, _>>()?,
					}),
					logical_type: None,
				};
				self.nodes[idx] = new_node;
				SchemaKey { idx }
			}
			raw::SchemaNode::Ref(ref reference) => {
				// This is supposed to be the fullname of a previous named
				// type. According to the spec the type definition should
				// always be parsed before, but we support out-of-order
				// definitions as well.
				let name_key = NameKey::from_reference(reference, enclosing_namespace);
				match self.names.get(&name_key) {
					Some(&idx) => SchemaKey { idx },
					None => {
						let idx = self.unresolved_names.len();
						self.unresolved_names.push(name_key);
						SchemaKey {
							idx: idx | LATE_NAME_LOOKUP_REMAP_BIT,
						}
					}
				}
			}
		})
	}

	fn register_object(
		&mut self,
		object: &'a raw::SchemaNodeObject<'a>,
		enclosing_namespace: Option<&'a str>,
	) -> Result<SchemaKey, SchemaError> {
		let idx = self.nodes.len();

		let name_key = match object.name {
			Some(ref name) => Some(NameKey::from_parts(
				&name.0,
				object.namespace.as_ref().map(|n| &*n.0),
				enclosing_namespace,
			)),
			None => None,
		};
		let named =
			|type_: raw::Type, state: &mut Self| -> Result<(Name, NameKey<'a>), SchemaError> {
				match name_key {
					None => Err(SchemaError::msg(format_args!(
						"Missing name for type {:?}",
						type_
					))),
					Some(name_key) => {
						if state.names.insert(name_key, idx).is_some() {
							return Err(SchemaError::msg(format_args!(
								"The Schema contains duplicate definitions for {}",
								name_key
							)));
						}
						Ok((name_key.name(), name_key))
					}
				}
			};
		let aliases = || -> Vec<String> {
			object
				.aliases
				.iter()
				.flatten()
				.map(|a| (*a.0).to_owned())
				.collect()
		};

		macro_rules! field {
			($type_: ident $name: ident) => {
				match &object.$name {
					Some(v) => v,
					_ => {
						return Err(SchemaError::msg(format_args!(
							concat!("Missing field `", stringify!($name), "` on type {:?}"),
							$type_
						)));
					}
				}
			};
		}

		// Reserve the spot for us
		self.nodes.push(SchemaNode {
			type_: SchemaType::Null,
			logical_type: None,
		});

		let type_ = match object.type_ {
			raw::SchemaNode::Type(t @ raw::Type::Array) => SchemaType::Array(Array {
				items: self.register_node(field!(t items), enclosing_namespace)?,
			}),
			raw::SchemaNode::Type(t @ raw::Type::Map) => SchemaType::Map(Map {
				values: self.register_node(field!(t values), enclosing_namespace)?,
			}),
			raw::SchemaNode::Type(t @ raw::Type::Enum) => {
				let (name, _) = named(t, self)?;
				let symbols: Vec<String> = field!(t symbols)
					.iter()
					.map(|s| (*s.0).to_owned())
					.collect();
				validate_enum_symbols(&name, &symbols)?;
				SchemaType::Enum(Enum {
					name,
					aliases: aliases(),
					symbols,
				})
			}
			raw::SchemaNode::Type(t @ raw::Type::Fixed) => {
				let (name, _) = named(t, self)?;
				SchemaType::Fixed(Fixed {
					name,
					aliases: aliases(),
					size: *field!(t size),
				})
			}
			raw::SchemaNode::Type(t @ raw::Type::Record) => {
				let (name, name_key) = named(t, self)?;
				let mut field_names: HashSet<&str> = HashSet::new();
				let fields = field!(t fields)
					.iter()
					.map(|field| {
						if !field_names.insert(&field.name.0) {
							return Err(SchemaError::msg(format_args!(
								"Record {} contains duplicate field name {:?}",
								name_key, field.name.0
							)));
						}
						Ok(RecordField {
							name: (*field.name.0).to_owned(),
							doc: field.doc.as_ref().map(|d| (*d.0).to_owned()),
							default: field.default.clone(),
							type_: self.register_node(&field.type_, name_key.namespace)?,
						})
					})
					.collect::<Result<_, SchemaError>>()?;
				SchemaType::Record(Record {
					name,
					aliases: aliases(),
					doc: object.doc.as_ref().map(|d| (*d.0).to_owned()),
					fields,
				})
			}
			raw::SchemaNode::Type(primitive) => primitive_type(primitive)?,
			ref inner_type @ (raw::SchemaNode::Ref(_)
			| raw::SchemaNode::Object(_)
			| raw::SchemaNode::Union(_)) => {
				// We have to allow {"type": {"type": "string"}} (an object
				// with an inner type and nothing else is a valid
				// representation). However in that case we would ignore all
				// keys that are set at our current level, so we check for
				// this.
				match object {
					&raw::SchemaNodeObject {
						type_: _,
						logical_type: _,
						name: _,
						namespace: _,
						aliases: _,
						doc: _,
						fields: None,
						symbols: None,
						items: None,
						values: None,
						size: None,
						precision: None,
						scale: None,
					} => {
						self.nodes.pop().expect("We have just pushed");
						return self.register_node(
							inner_type,
							name_key
								.as_ref()
								.and_then(|n| n.namespace)
								.or(enclosing_namespace),
						);
					}
					_ => {
						return Err(SchemaError::new(
							"Got unnecessarily-nested type, but local object \
								properties are set - those would be ignored",
						))
					}
				}
			}
		};

		self.nodes[idx] = SchemaNode {
			logical_type: object
				.logical_type
				.as_ref()
				.and_then(|l| logical_type_candidate(&l.0, object)),
			type_,
		};
		Ok(SchemaKey { idx })
	}
}

fn primitive_type(type_: raw::Type) -> Result<SchemaType, SchemaError> {
	Ok(match type_ {
		raw::Type::Null => SchemaType::Null,
		raw::Type::Boolean => SchemaType::Boolean,
		raw::Type::Int => SchemaType::Int,
		raw::Type::Long => SchemaType::Long,
		raw::Type::Float => SchemaType::Float,
		raw::Type::Double => SchemaType::Double,
		raw::Type::Bytes => SchemaType::Bytes,
		raw::Type::String => SchemaType::String,
		complex_type @ (raw::Type::Array
		| raw::Type::Map
		| raw::Type::Record
		| raw::Type::Enum
		| raw::Type::Fixed) => {
			return Err(SchemaError::msg(format_args!(
				"Expected primitive type name, but got {:?} as type which is a complex \
					type, so should be in an object.",
				complex_type
			)))
		}
	})
}

/// Turn a `logicalType` annotation into a [`LogicalType`]
///
/// Unknown logical type names and `decimal`s with unusable parameters return
/// `None`: the annotation silently degrades to the base type. Base-type
/// compatibility is checked later, once named references are resolved (see
/// [`degrade_invalid_logical_types`]).
fn logical_type_candidate(
	logical_type: &str,
	object: &raw::SchemaNodeObject<'_>,
) -> Option<LogicalType> {
	match logical_type {
		"decimal" => {
			let precision = object.precision?;
			let scale = object.scale.unwrap_or(0);
			if precision == 0 || scale as u64 > precision as u64 {
				return None;
			}
			Some(LogicalType::Decimal(Decimal { precision, scale }))
		}
		"uuid" => Some(LogicalType::Uuid),
		"date" => Some(LogicalType::Date),
		"time-millis" => Some(LogicalType::TimeMillis),
		"time-micros" => Some(LogicalType::TimeMicros),
		"timestamp-millis" => Some(LogicalType::TimestampMillis),
		"timestamp-micros" => Some(LogicalType::TimestampMicros),
		"duration" => Some(LogicalType::Duration),
		_ => None,
	}
}

fn validate_enum_symbols(name: &Name, symbols: &[String]) -> Result<(), SchemaError> {
	let mut seen: HashSet<&str> = HashSet::new();
	for symbol in symbols {
		let mut chars = symbol.chars();
		let valid = match chars.next() {
			None => false,
			Some(first) => {
				(first.is_ascii_alphabetic() || first == '_')
					&& chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
			}
		};
		if !valid {
			return Err(SchemaError::msg(format_args!(
				"Enum {:?} contains invalid symbol {:?}",
				name.fully_qualified_name(),
				symbol
			)));
		}
		if !seen.insert(symbol) {
			return Err(SchemaError::msg(format_args!(
				"Enum {:?} contains duplicate symbol {:?}",
				name.fully_qualified_name(),
				symbol
			)));
		}
	}
	Ok(())
}

/// Union variants are unique per Avro type-tag: at most one of each
/// primitive, one `array`, one `map`, and any number of distinct named
/// types. Unions may not directly contain unions.
fn validate_unions(schema: &Schema) -> Result<(), SchemaError> {
	for node in &schema.nodes {
		if let SchemaType::Union(ref union) = node.type_ {
			let mut tags: HashSet<&str> = HashSet::new();
			for &variant in &union.variants {
				let variant_node = schema
					.get(variant)
					.ok_or_else(|| SchemaError::new("Union variant refers to non-existing node"))?;
				let tag = match variant_node.type_ {
					SchemaType::Union(_) => {
						return Err(SchemaError::new("Unions may not directly contain unions"))
					}
					ref type_ => match type_.name() {
						Some(name) => name.fully_qualified_name(),
						None => type_.type_name(),
					},
				};
				if !tags.insert(tag) {
					return Err(SchemaError::msg(format_args!(
						"Union contains duplicate variant {:?}",
						tag
					)));
				}
			}
		}
	}
	Ok(())
}

/// Drop logical type annotations whose base type does not match the logical
/// type. This runs after name resolution so that e.g. a `duration` over a
/// named reference to a `fixed(12)` is honored.
fn degrade_invalid_logical_types(schema: &mut Schema) {
	for idx in 0..schema.nodes.len() {
		let keep = match schema.nodes[idx].logical_type {
			None => continue,
			Some(ref logical_type) => match (logical_type, &schema.nodes[idx].type_) {
				(LogicalType::Decimal(_), SchemaType::Bytes)
				| (LogicalType::Decimal(_), SchemaType::Fixed(_))
				| (LogicalType::Uuid, SchemaType::String)
				| (LogicalType::Date, SchemaType::Int)
				| (LogicalType::TimeMillis, SchemaType::Int)
				| (LogicalType::TimeMicros, SchemaType::Long)
				| (LogicalType::TimestampMillis, SchemaType::Long)
				| (LogicalType::TimestampMicros, SchemaType::Long) => true,
				(LogicalType::Duration, SchemaType::Fixed(ref fixed)) => fixed.size == 12,
				_ => false,
			},
		};
		if !keep {
			schema.nodes[idx].logical_type = None;
		}
	}
}

/// A record directly containing itself through mandatory fields only (no
/// union, array or map on the path) could never be instantiated nor decoded,
/// so it is rejected at parse time.
fn check_for_unconditional_cycles(schema: &Schema) -> Result<(), SchemaError> {
	#[derive(Clone, Copy, PartialEq)]
	enum Mark {
		Unvisited,
		InProgress,
		Done,
	}
	fn visit(schema: &Schema, idx: usize, marks: &mut [Mark]) -> Result<(), SchemaError> {
		match marks[idx] {
			Mark::Done => return Ok(()),
			Mark::InProgress => {
				return Err(SchemaError::msg(format_args!(
					"Schema contains a record cycle that is not broken by a union, \
						array or map: {:?}",
					schema.nodes[idx]
						.type_
						.name()
						.map(Name::fully_qualified_name)
						.unwrap_or("<unnamed>")
				)))
			}
			Mark::Unvisited => {}
		}
		marks[idx] = Mark::InProgress;
		// Only record fields propagate the obligation to produce a value:
		// unions, arrays and maps can all encode "nothing more here".
		if let SchemaType::Record(ref record) = schema.nodes[idx].type_ {
			for field in &record.fields {
				visit(schema, field.type_.idx, marks)?;
			}
		}
		marks[idx] = Mark::Done;
		Ok(())
	}
	let mut marks = vec![Mark::Unvisited; schema.nodes.len()];
	for idx in 0..schema.nodes.len() {
		visit(schema, idx, &mut marks)?;
	}
	Ok(())
}

#[derive(PartialEq, Eq, Hash, Clone, Copy)]
struct NameKey<'a> {
	namespace: Option<&'a str>,
	name: &'a str,
}

impl<'a> NameKey<'a> {
	fn from_parts(
		name: &'a str,
		explicit_namespace: Option<&'a str>,
		enclosing_namespace: Option<&'a str>,
	) -> Self {
		if let Some((namespace, name)) = name.rsplit_once('.') {
			// A name containing dots is already fully qualified and
			// overrides any namespace attribute
			NameKey {
				namespace: Some(namespace).filter(|s| !s.is_empty()),
				name,
			}
		} else {
			NameKey {
				namespace: match explicit_namespace {
					// An explicitly empty namespace indicates the null
					// namespace
					Some(namespace) => Some(namespace).filter(|s| !s.is_empty()),
					None => enclosing_namespace,
				},
				name,
			}
		}
	}

	fn from_reference(reference: &'a str, enclosing_namespace: Option<&'a str>) -> Self {
		if let Some((namespace, name)) = reference.rsplit_once('.') {
			NameKey {
				namespace: Some(namespace).filter(|s| !s.is_empty()),
				name,
			}
		} else {
			NameKey {
				namespace: enclosing_namespace,
				name: reference,
			}
		}
	}

	fn name(&self) -> Name {
		Name::from_parts(self.namespace, self.name)
	}
}

impl std::fmt::Display for NameKey<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self.namespace {
			None => self.name.fmt(f),
			Some(namespace) => write!(f, "{}.{}", namespace, self.name),
		}
	}
}

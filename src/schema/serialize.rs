//! Canonical JSON projection of a [`Schema`]
//!
//! Property ordering inside type objects is fixed (`type`, `name`,
//! `namespace`, `doc`, then the shape attribute, then `aliases`, then
//! logical-type attributes), primitives emit as bare strings unless a
//! logical-type annotation forces object form, and named types that were
//! already emitted within the current emission are referenced by their fully
//! qualified name instead of being re-expanded. The output is deterministic,
//! which is what makes the emitted form canonical.

use crate::schema::*;

use {
	serde::ser::*,
	std::{cell::RefCell, collections::HashSet},
};

impl Schema {
	/// The canonical JSON form of this schema
	///
	/// This is what gets embedded in the `avro.schema` metadata of object
	/// container files. Parsing it back yields a schema equal to this one,
	/// and re-emitting that schema yields byte-identical JSON.
	pub fn json(&self) -> String {
		serde_json::to_string(self).expect("Schema serialization to JSON string cannot fail")
	}
}

impl Serialize for Schema {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let emitted_names = RefCell::new(HashSet::new());
		SerializeSchema {
			schema: self,
			emitted_names: &emitted_names,
			enclosing_namespace: None,
			key: SchemaKey::from_idx(0),
		}
		.serialize(serializer)
	}
}

struct SerializeSchema<'a, K> {
	schema: &'a Schema,
	emitted_names: &'a RefCell<HashSet<usize>>,
	enclosing_namespace: Option<&'a str>,
	key: K,
}

impl<'a, K> SerializeSchema<'a, K> {
	fn serializable<NK>(&self, key: NK) -> SerializeSchema<'a, NK> {
		SerializeSchema {
			schema: self.schema,
			emitted_names: self.emitted_names,
			enclosing_namespace: self.enclosing_namespace,
			key,
		}
	}

	fn serializable_under<NK>(&self, key: NK, namespace: Option<&'a str>) -> SerializeSchema<'a, NK> {
		SerializeSchema {
			schema: self.schema,
			emitted_names: self.emitted_names,
			enclosing_namespace: namespace,
			key,
		}
	}

	/// Emit `name` (and `namespace` where it could not be inferred from the
	/// enclosing definition on re-parse)
	fn serialize_name<M: SerializeMap>(&self, map: &mut M, name: &'a Name) -> Result<(), M::Error> {
		map.serialize_entry("name", name.name())?;
		if name.namespace() != self.enclosing_namespace {
			map.serialize_entry("namespace", name.namespace().unwrap_or(""))?;
		}
		Ok(())
	}
}

impl Serialize for SerializeSchema<'_, SchemaKey> {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let node = self
			.schema
			.get(self.key)
			.ok_or_else(|| S::Error::custom("SchemaKey refers to non-existing node"))?;

		if let Some(name) = node.type_.name() {
			// Subsequent occurrences of a named type are references, not
			// redefinitions
			if self.emitted_names.borrow().contains(&self.key.idx) {
				return serializer.serialize_str(name.fully_qualified_name());
			}
			self.emitted_names.borrow_mut().insert(self.key.idx);
		}

		match node.type_ {
			SchemaType::Null
			| SchemaType::Boolean
			| SchemaType::Int
			| SchemaType::Long
			| SchemaType::Float
			| SchemaType::Double
			| SchemaType::Bytes
			| SchemaType::String => match node.logical_type {
				// The canonical form of a primitive is the bare string,
				// unless a logical-type annotation requires object form
				None => serializer.serialize_str(node.type_.type_name()),
				Some(ref logical_type) => {
					let mut map = serializer.serialize_map(None)?;
					map.serialize_entry("type", node.type_.type_name())?;
					serialize_logical_type(&mut map, logical_type)?;
					map.end()
				}
			},
			SchemaType::Array(ref array) => {
				let mut map = serializer.serialize_map(None)?;
				map.serialize_entry("type", "array")?;
				map.serialize_entry("items", &self.serializable(array.items))?;
				map.end()
			}
			SchemaType::Map(ref map_type) => {
				let mut map = serializer.serialize_map(None)?;
				map.serialize_entry("type", "map")?;
				map.serialize_entry("values", &self.serializable(map_type.values))?;
				map.end()
			}
			SchemaType::Union(ref union) => {
				let mut seq = serializer.serialize_seq(Some(union.variants.len()))?;
				for &variant in &union.variants {
					seq.serialize_element(&self.serializable(variant))?;
				}
				seq.end()
			}
			SchemaType::Record(ref record) => {
				let mut map = serializer.serialize_map(None)?;
				map.serialize_entry("type", "record")?;
				self.serialize_name(&mut map, &record.name)?;
				if let Some(ref doc) = record.doc {
					map.serialize_entry("doc", doc)?;
				}
				map.serialize_entry(
					"fields",
					&self.serializable_under(record.fields.as_slice(), record.name.namespace()),
				)?;
				if !record.aliases.is_empty() {
					map.serialize_entry("aliases", &record.aliases)?;
				}
				map.end()
			}
			SchemaType::Enum(ref enum_) => {
				let mut map = serializer.serialize_map(None)?;
				map.serialize_entry("type", "enum")?;
				self.serialize_name(&mut map, &enum_.name)?;
				map.serialize_entry("symbols", &enum_.symbols)?;
				if !enum_.aliases.is_empty() {
					map.serialize_entry("aliases", &enum_.aliases)?;
				}
				map.end()
			}
			SchemaType::Fixed(ref fixed) => {
				let mut map = serializer.serialize_map(None)?;
				map.serialize_entry("type", "fixed")?;
				self.serialize_name(&mut map, &fixed.name)?;
				map.serialize_entry("size", &fixed.size)?;
				if !fixed.aliases.is_empty() {
					map.serialize_entry("aliases", &fixed.aliases)?;
				}
				if let Some(ref logical_type) = node.logical_type {
					serialize_logical_type(&mut map, logical_type)?;
				}
				map.end()
			}
		}
	}
}

fn serialize_logical_type<M: SerializeMap>(
	map: &mut M,
	logical_type: &LogicalType,
) -> Result<(), M::Error> {
	map.serialize_entry("logicalType", logical_type.as_str())?;
	if let LogicalType::Decimal(ref decimal) = *logical_type {
		map.serialize_entry("precision", &decimal.precision)?;
		map.serialize_entry("scale", &decimal.scale)?;
	}
	Ok(())
}

impl Serialize for SerializeSchema<'_, &[RecordField]> {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut seq = serializer.serialize_seq(Some(self.key.len()))?;
		for field in self.key {
			seq.serialize_element(&self.serializable(field))?;
		}
		seq.end()
	}
}

impl Serialize for SerializeSchema<'_, &RecordField> {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut map = serializer.serialize_map(None)?;
		map.serialize_entry("name", &self.key.name)?;
		map.serialize_entry("type", &self.serializable(self.key.type_))?;
		if let Some(ref doc) = self.key.doc {
			map.serialize_entry("doc", doc)?;
		}
		if let Some(ref default) = self.key.default {
			map.serialize_entry("default", default)?;
		}
		map.end()
	}
}

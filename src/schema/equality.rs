//! Structural schema equality
//!
//! Schemas compare by shape: same type variants, same logical annotations,
//! same names (fully qualified) for named types, and recursively equal
//! children. Since schemas may be cyclic, node pairs currently under
//! comparison are assumed equal, which makes the recursion terminate.

use crate::schema::*;

use std::collections::HashSet;

impl PartialEq for Schema {
	fn eq(&self, other: &Self) -> bool {
		let mut in_progress = HashSet::new();
		eq_keys(
			self,
			SchemaKey::from_idx(0),
			other,
			SchemaKey::from_idx(0),
			&mut in_progress,
		)
	}
}

fn eq_keys(
	left_schema: &Schema,
	left: SchemaKey,
	right_schema: &Schema,
	right: SchemaKey,
	in_progress: &mut HashSet<(usize, usize)>,
) -> bool {
	if !in_progress.insert((left.idx, right.idx)) {
		// Already being compared further up the stack
		return true;
	}
	let (left_node, right_node) = match (left_schema.get(left), right_schema.get(right)) {
		(Some(l), Some(r)) => (l, r),
		_ => return false,
	};
	let mut recurse =
		|l: SchemaKey, r: SchemaKey| eq_keys(left_schema, l, right_schema, r, in_progress);
	let types_eq = match (&left_node.type_, &right_node.type_) {
		(SchemaType::Null, SchemaType::Null)
		| (SchemaType::Boolean, SchemaType::Boolean)
		| (SchemaType::Int, SchemaType::Int)
		| (SchemaType::Long, SchemaType::Long)
		| (SchemaType::Float, SchemaType::Float)
		| (SchemaType::Double, SchemaType::Double)
		| (SchemaType::Bytes, SchemaType::Bytes)
		| (SchemaType::String, SchemaType::String) => true,
		(SchemaType::Array(l), SchemaType::Array(r)) => recurse(l.items, r.items),
		(SchemaType::Map(l), SchemaType::Map(r)) => recurse(l.values, r.values),
		(SchemaType::Union(l), SchemaType::Union(r)) => {
			l.variants.len() == r.variants.len()
				&& l.variants
					.iter()
					.zip(&r.variants)
					.all(|(&lv, &rv)| recurse(lv, rv))
		}
		(SchemaType::Record(l), SchemaType::Record(r)) => {
			l.name == r.name
				&& l.aliases == r.aliases
				&& l.doc == r.doc
				&& l.fields.len() == r.fields.len()
				&& l.fields.iter().zip(&r.fields).all(|(lf, rf)| {
					lf.name == rf.name
						&& lf.doc == rf.doc
						&& lf.default == rf.default
						&& recurse(lf.type_, rf.type_)
				})
		}
		(SchemaType::Enum(l), SchemaType::Enum(r)) => {
			l.name == r.name && l.aliases == r.aliases && l.symbols == r.symbols
		}
		(SchemaType::Fixed(l), SchemaType::Fixed(r)) => {
			l.name == r.name && l.aliases == r.aliases && l.size == r.size
		}
		_ => false,
	};
	let eq = types_eq && left_node.logical_type == right_node.logical_type;
	in_progress.remove(&(left.idx, right.idx));
	eq
}

//! Plain structural schema types. Federation directives are not represented here: normalization
//! strips them into [`crate::ConfigurationData`] and per-field metadata. Only the directives that
//! survive into the supergraph are kept, in [`PersistedDirectives`].

use indexmap::IndexMap;
use serde::Serialize;
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

pub const BUILTIN_SCALARS: &[&str] = &["ID", "String", "Int", "Float", "Boolean"];

/// A schema: type definitions keyed, and therefore ordered, by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Schema {
    pub types: BTreeMap<String, TypeDefinition>,
}

impl Schema {
    pub fn get(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    pub fn field(&self, type_name: &str, field_name: &str) -> Option<&FieldDefinition> {
        self.types.get(type_name)?.fields.get(field_name)
    }

    /// Object types implementing `interface_name`.
    pub fn implementers<'a>(&'a self, interface_name: &'a str) -> impl Iterator<Item = &'a TypeDefinition> + 'a {
        self.types
            .values()
            .filter(move |ty| ty.kind == TypeKind::Object && ty.interfaces.contains(interface_name))
    }

    /// The concrete object types a value of type `name` can be at runtime.
    pub fn possible_types(&self, name: &str) -> BTreeSet<String> {
        match self.types.get(name) {
            Some(ty) if ty.kind == TypeKind::Object => BTreeSet::from([ty.name.clone()]),
            Some(ty) if ty.kind == TypeKind::Interface => self.implementers(name).map(|ty| ty.name.clone()).collect(),
            Some(ty) if ty.kind == TypeKind::Union => ty.members.clone(),
            _ => BTreeSet::new(),
        }
    }

    pub fn is_composite(&self, name: &str) -> bool {
        self.types.get(name).is_some_and(|ty| ty.kind.is_composite())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TypeKind {
    Object,
    Interface,
    Union,
    Enum,
    Scalar,
    InputObject,
}

impl TypeKind {
    /// Types with a selection set: objects, interfaces and unions.
    pub fn is_composite(self) -> bool {
        matches!(self, TypeKind::Object | TypeKind::Interface | TypeKind::Union)
    }

    pub(crate) fn keyword(self) -> &'static str {
        match self {
            TypeKind::Object => "type",
            TypeKind::Interface => "interface",
            TypeKind::Union => "union",
            TypeKind::Enum => "enum",
            TypeKind::Scalar => "scalar",
            TypeKind::InputObject => "input",
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TypeKind::Object => "object",
            TypeKind::Interface => "interface",
            TypeKind::Union => "union",
            TypeKind::Enum => "enum",
            TypeKind::Scalar => "scalar",
            TypeKind::InputObject => "input object",
        })
    }
}

/// One named type. Which of the member collections is populated depends on `kind`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeDefinition {
    pub name: String,
    pub kind: TypeKind,
    pub description: Option<String>,
    pub directives: PersistedDirectives,
    /// Objects and interfaces.
    pub interfaces: BTreeSet<String>,
    /// Objects and interfaces.
    pub fields: IndexMap<String, FieldDefinition>,
    /// Input objects.
    pub input_fields: IndexMap<String, InputValueDefinition>,
    /// Unions.
    pub members: BTreeSet<String>,
    /// Enums.
    pub values: IndexMap<String, EnumValueDefinition>,
}

impl TypeDefinition {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        TypeDefinition {
            name: name.into(),
            kind,
            description: None,
            directives: PersistedDirectives::default(),
            interfaces: BTreeSet::new(),
            fields: IndexMap::new(),
            input_fields: IndexMap::new(),
            members: BTreeSet::new(),
            values: IndexMap::new(),
        }
    }

    /// Sort every member collection by name.
    pub(crate) fn sort(&mut self) {
        self.fields.sort_keys();
        self.input_fields.sort_keys();
        self.values.sort_keys();

        for field in self.fields.values_mut() {
            field.arguments.sort_keys();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDefinition {
    pub name: String,
    pub ty: FieldType,
    pub arguments: IndexMap<String, InputValueDefinition>,
    pub description: Option<String>,
    pub directives: PersistedDirectives,
}

/// Field arguments and input object fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputValueDefinition {
    pub name: String,
    pub ty: FieldType,
    pub default_value: Option<Value>,
    pub description: Option<String>,
    pub directives: PersistedDirectives,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumValueDefinition {
    pub name: String,
    pub description: Option<String>,
    pub directives: PersistedDirectives,
}

/// The directives that are part of the composed schema. Everything else is either federation
/// metadata or dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersistedDirectives {
    pub deprecated: Option<Deprecation>,
    pub tags: BTreeSet<String>,
    pub inaccessible: bool,
}

impl PersistedDirectives {
    pub fn is_empty(&self) -> bool {
        self.deprecated.is_none() && self.tags.is_empty() && !self.inaccessible
    }

    /// Merge another subgraph's directives into these. The first deprecation reason wins.
    pub(crate) fn merge(&mut self, other: &PersistedDirectives) {
        if self.deprecated.is_none() {
            self.deprecated.clone_from(&other.deprecated);
        }

        self.tags.extend(other.tags.iter().cloned());
        self.inaccessible |= other.inaccessible;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deprecation {
    pub reason: Option<String>,
}

/// A named type with its list and non-null wrappers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FieldType {
    pub name: String,
    pub wrapping: Wrapping,
}

impl FieldType {
    pub fn named(name: impl Into<String>) -> Self {
        FieldType {
            name: name.into(),
            wrapping: Wrapping::default(),
        }
    }

    pub fn is_required(&self) -> bool {
        self.wrapping.is_required()
    }

    /// Compose two field types for input. The most required of the two is picked.
    pub fn compose_for_input(&self, other: &FieldType) -> Option<FieldType> {
        Some(if self.compose(other)? { other.clone() } else { self.clone() })
    }

    /// Compose two field types for output. The less required of the two is picked.
    pub fn compose_for_output(&self, other: &FieldType) -> Option<FieldType> {
        Some(if self.compose(other)? { self.clone() } else { other.clone() })
    }

    /// Returns whether `other` is the more required type. The function returns `None` whenever
    /// the two types mismatch to such extent that they can't be composed: different named types,
    /// different list depth, or disagreeing nullability below the outermost wrapper.
    fn compose(&self, other: &FieldType) -> Option<bool> {
        if self == other {
            return Some(true);
        }

        if self.name != other.name || self.wrapping.lists.len() != other.wrapping.lists.len() {
            return None;
        }

        match (self.wrapping.lists.split_last(), other.wrapping.lists.split_last()) {
            (None, None) => Some(other.wrapping.inner_is_required),
            (Some((self_outer, self_inner)), Some((other_outer, other_inner))) => {
                if self.wrapping.inner_is_required != other.wrapping.inner_is_required || self_inner != other_inner {
                    return None;
                }

                Some(*other_outer == ListWrapping::RequiredList && *self_outer != ListWrapping::RequiredList)
            }
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in &self.wrapping.lists {
            f.write_str("[")?;
        }

        f.write_str(&self.name)?;

        if self.wrapping.inner_is_required {
            f.write_str("!")?;
        }

        for list in &self.wrapping.lists {
            f.write_str("]")?;

            if *list == ListWrapping::RequiredList {
                f.write_str("!")?;
            }
        }

        Ok(())
    }
}

/// List and non-null wrappers around a named type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Wrapping {
    pub inner_is_required: bool,
    /// Innermost first.
    pub lists: Vec<ListWrapping>,
}

impl Wrapping {
    pub fn non_null(mut self) -> Self {
        self.inner_is_required = true;
        self
    }

    pub fn list(mut self) -> Self {
        self.lists.push(ListWrapping::NullableList);
        self
    }

    pub fn list_non_null(mut self) -> Self {
        self.lists.push(ListWrapping::RequiredList);
        self
    }

    /// Whether the outermost wrapper is non-null.
    pub fn is_required(&self) -> bool {
        match self.lists.last() {
            Some(list) => *list == ListWrapping::RequiredList,
            None => self.inner_is_required,
        }
    }

    pub fn is_list(&self) -> bool {
        !self.lists.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ListWrapping {
    NullableList,
    RequiredList,
}

/// A constant GraphQL value, as found in default values and directive arguments.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Enum(String),
    List(Vec<Value>),
    Object(Vec<(String, Value)>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Int(n) => fmt::Display::fmt(n, f),
            // Debug keeps the fractional part on whole numbers.
            Value::Float(n) => fmt::Debug::fmt(n, f),
            Value::String(s) => crate::render_sdl::write_quoted(f, s),
            Value::Boolean(b) => fmt::Display::fmt(b, f),
            Value::Enum(name) => f.write_str(name),
            Value::List(items) => {
                f.write_str("[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    fmt::Display::fmt(item, f)?;
                }
                f.write_str("]")
            }
            Value::Object(fields) => {
                f.write_str("{")?;
                for (idx, (name, value)) in fields.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(name: &str, wrapping: Wrapping) -> FieldType {
        FieldType {
            name: name.to_owned(),
            wrapping,
        }
    }

    #[test]
    fn output_composition_picks_the_nullable_type() {
        let required = ty("String", Wrapping::default().non_null());
        let nullable = ty("String", Wrapping::default());

        assert_eq!(required.compose_for_output(&nullable), Some(nullable.clone()));
        assert_eq!(nullable.compose_for_output(&required), Some(nullable.clone()));
        assert_eq!(required.compose_for_input(&nullable), Some(required.clone()));
        assert_eq!(nullable.compose_for_input(&required), Some(required));
    }

    #[test]
    fn outer_list_nullability_composes() {
        let required_list = ty("ID", Wrapping::default().non_null().list_non_null());
        let nullable_list = ty("ID", Wrapping::default().non_null().list());

        assert_eq!(required_list.compose_for_output(&nullable_list), Some(nullable_list.clone()));
        assert_eq!(required_list.compose_for_input(&nullable_list), Some(required_list));
    }

    #[test]
    fn inner_nullability_must_match() {
        let inner_required = ty("ID", Wrapping::default().non_null().list());
        let inner_nullable = ty("ID", Wrapping::default().list());

        assert_eq!(inner_required.compose_for_output(&inner_nullable), None);
        assert_eq!(inner_required.compose_for_input(&inner_nullable), None);
    }

    #[test]
    fn list_depth_and_name_must_match() {
        let list = ty("Int", Wrapping::default().list());
        let scalar = ty("Int", Wrapping::default());
        let other_name = ty("Float", Wrapping::default().list());

        assert_eq!(list.compose_for_output(&scalar), None);
        assert_eq!(list.compose_for_output(&other_name), None);
    }

    #[test]
    fn display() {
        let nested = ty("Int", Wrapping::default().non_null().list().list_non_null());
        assert_eq!(nested.to_string(), "[[Int!]]!");
        assert_eq!(ty("Int", Wrapping::default()).to_string(), "Int");
    }

    #[test]
    fn value_display() {
        let value = Value::Object(vec![
            ("a".to_owned(), Value::Float(1.0)),
            ("b".to_owned(), Value::List(vec![Value::Enum("RED".to_owned()), Value::Null])),
            ("c".to_owned(), Value::String("say \"hi\"".to_owned())),
        ]);

        insta::assert_snapshot!(value, @r#"{a: 1.0, b: [RED, null], c: "say \"hi\""}"#);
    }
}

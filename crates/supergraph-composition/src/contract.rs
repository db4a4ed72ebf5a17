//! Contracts filter the supergraph by `@tag`, hiding elements behind `@inaccessible`. The client
//! schema is the supergraph without its `@inaccessible` elements.

use crate::{
    ast::{FieldType, PersistedDirectives, Schema, TypeDefinition, TypeKind, BUILTIN_SCALARS},
    DiagnosticKind, Diagnostics,
};
use itertools::Itertools;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

/// Which tagged parts of the supergraph a contract keeps.
///
/// When excluded tags are given, every type, field, argument, enum value and input field tagged
/// with one of them is hidden, and included tags are ignored. Otherwise every type and child
/// element not tagged with an included tag is hidden, unless its parent type is.
///
/// ```toml
/// excludedTags = ["internal"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ContractTags {
    pub excluded_tags: BTreeSet<String>,
    pub included_tags: BTreeSet<String>,
}

impl ContractTags {
    pub fn excluding<T: Into<String>>(tags: impl IntoIterator<Item = T>) -> Self {
        ContractTags {
            excluded_tags: tags.into_iter().map(Into::into).collect(),
            included_tags: BTreeSet::new(),
        }
    }

    pub fn including<T: Into<String>>(tags: impl IntoIterator<Item = T>) -> Self {
        ContractTags {
            excluded_tags: BTreeSet::new(),
            included_tags: tags.into_iter().map(Into::into).collect(),
        }
    }
}

/// Mark the elements the contract hides `@inaccessible`.
#[tracing::instrument(skip_all)]
pub(crate) fn apply(schema: &mut Schema, contract: &ContractTags) {
    let definitions = schema.types.values_mut().filter(|definition| {
        !definition.directives.inaccessible
            && !(definition.kind == TypeKind::Scalar && BUILTIN_SCALARS.contains(&definition.name.as_str()))
    });

    if !contract.excluded_tags.is_empty() {
        definitions.for_each(|definition| exclude(definition, &contract.excluded_tags));
    } else if !contract.included_tags.is_empty() {
        definitions.for_each(|definition| include(definition, &contract.included_tags));
    }
}

fn tagged_with(directives: &PersistedDirectives, tags: &BTreeSet<String>) -> bool {
    !directives.tags.is_disjoint(tags)
}

fn exclude(definition: &mut TypeDefinition, tags: &BTreeSet<String>) {
    if tagged_with(&definition.directives, tags) {
        definition.directives.inaccessible = true;
        return;
    }

    let hide = |directives: &PersistedDirectives| tagged_with(directives, tags);

    let nothing_left = match definition.kind {
        TypeKind::Scalar | TypeKind::Union => false,
        TypeKind::Enum => hide_children(definition.values.values_mut().map(|value| &mut value.directives), hide),
        TypeKind::InputObject => hide_children(
            definition.input_fields.values_mut().map(|field| &mut field.directives),
            hide,
        ),
        TypeKind::Object | TypeKind::Interface => {
            for argument in definition.fields.values_mut().flat_map(|field| field.arguments.values_mut()) {
                argument.directives.inaccessible |= hide(&argument.directives);
            }

            hide_children(definition.fields.values_mut().map(|field| &mut field.directives), hide)
        }
    };

    definition.directives.inaccessible |= nothing_left;
}

fn include(definition: &mut TypeDefinition, tags: &BTreeSet<String>) {
    if tagged_with(&definition.directives, tags) {
        return;
    }

    let children: Vec<&mut PersistedDirectives> = match definition.kind {
        TypeKind::Scalar | TypeKind::Union => Vec::new(),
        TypeKind::Enum => definition.values.values_mut().map(|value| &mut value.directives).collect(),
        TypeKind::InputObject => definition
            .input_fields
            .values_mut()
            .map(|field| &mut field.directives)
            .collect(),
        TypeKind::Object | TypeKind::Interface => definition
            .fields
            .values_mut()
            .map(|field| &mut field.directives)
            .collect(),
    };

    let nothing_left = if children.iter().all(|directives| directives.tags.is_empty()) {
        true
    } else {
        hide_children(children.into_iter(), |directives| !tagged_with(directives, tags))
    };

    definition.directives.inaccessible |= nothing_left;
}

/// Mark the children matching `hide` inaccessible. Returns whether none is left accessible.
fn hide_children<'a>(
    children: impl Iterator<Item = &'a mut PersistedDirectives>,
    hide: impl Fn(&PersistedDirectives) -> bool,
) -> bool {
    let mut accessible = 0;

    for directives in children {
        if !directives.inaccessible && hide(directives) {
            directives.inaccessible = true;
        }

        if !directives.inaccessible {
            accessible += 1;
        }
    }

    accessible == 0
}

/// Check the supergraph is still a valid schema once its `@inaccessible` elements are removed,
/// and build that client schema. `None` when the supergraph uses neither `@tag` nor
/// `@inaccessible`: the client schema is then the supergraph itself.
#[tracing::instrument(skip_all)]
pub(crate) fn client_schema(schema: &Schema, diagnostics: &mut Diagnostics) -> Option<Schema> {
    let mut uses_tags = false;
    let mut uses_inaccessible = false;

    for directives in all_directives(schema) {
        uses_tags |= !directives.tags.is_empty();
        uses_inaccessible |= directives.inaccessible;
    }

    if uses_inaccessible {
        validate(schema, diagnostics);
    }

    if !uses_tags && !uses_inaccessible {
        return None;
    }

    let is_accessible = |name: &String| schema.get(name).is_some_and(|ty| !ty.directives.inaccessible);
    let mut client = Schema::default();

    for definition in schema.types.values().filter(|ty| !ty.directives.inaccessible) {
        let mut definition = definition.clone();

        definition.interfaces.retain(is_accessible);
        definition.members.retain(is_accessible);
        definition.fields.retain(|_, field| !field.directives.inaccessible);
        definition.input_fields.retain(|_, field| !field.directives.inaccessible);
        definition.values.retain(|_, value| !value.directives.inaccessible);

        strip(&mut definition.directives);

        for field in definition.fields.values_mut() {
            strip(&mut field.directives);
            field.arguments.retain(|_, argument| !argument.directives.inaccessible);
            field.arguments.values_mut().for_each(|argument| strip(&mut argument.directives));
        }

        definition.input_fields.values_mut().for_each(|field| strip(&mut field.directives));
        definition.values.values_mut().for_each(|value| strip(&mut value.directives));

        client.types.insert(definition.name.clone(), definition);
    }

    Some(client)
}

/// Only `@deprecated` is part of the client schema.
fn strip(directives: &mut PersistedDirectives) {
    directives.tags.clear();
    directives.inaccessible = false;
}

fn all_directives(schema: &Schema) -> impl Iterator<Item = &PersistedDirectives> {
    schema.types.values().flat_map(|definition| {
        std::iter::once(&definition.directives)
            .chain(definition.fields.values().flat_map(|field| {
                std::iter::once(&field.directives).chain(field.arguments.values().map(|argument| &argument.directives))
            }))
            .chain(definition.input_fields.values().map(|field| &field.directives))
            .chain(definition.values.values().map(|value| &value.directives))
    })
}

fn validate(schema: &Schema, diagnostics: &mut Diagnostics) {
    if schema.get("Query").is_some_and(|query| query.directives.inaccessible) {
        diagnostics.push_fatal(
            DiagnosticKind::Merge,
            r#"The root query type "Query" must be present in the client schema; consequently, it must not be declared "@inaccessible"."#.to_owned(),
        );
    }

    let is_inaccessible_type = |name: &str| schema.get(name).is_some_and(|ty| ty.directives.inaccessible);
    let mut references: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut reference = |ty: &FieldType, coordinate: String| {
        if is_inaccessible_type(&ty.name) {
            references.entry(ty.name.clone()).or_default().push(coordinate);
        }
    };

    for definition in schema.types.values().filter(|ty| !ty.directives.inaccessible) {
        let type_name = &definition.name;

        if let Some(children) = all_children_inaccessible(schema, definition) {
            diagnostics.push_fatal(
                DiagnosticKind::Merge,
                format!(
                    r#"The {} "{type_name}" is invalid because all its {children} definitions are declared "@inaccessible"."#,
                    definition.kind
                ),
            );
        }

        for field in definition.fields.values() {
            if field.directives.inaccessible {
                continue;
            }

            reference(&field.ty, format!("{type_name}.{}", field.name));

            for argument in field.arguments.values() {
                let coordinate = format!("{type_name}.{}({}:)", field.name, argument.name);

                if !argument.directives.inaccessible {
                    reference(&argument.ty, coordinate);
                } else if argument.ty.is_required() && argument.default_value.is_none() {
                    diagnostics.push_fatal(
                        DiagnosticKind::Merge,
                        format!(
                            r#"The argument "{}" defined at coordinates "{coordinate}" is declared "@inaccessible"; however, it is a required argument of field "{type_name}.{}"."#,
                            argument.name, field.name
                        ),
                    );
                }
            }
        }

        for field in definition.input_fields.values() {
            let coordinate = format!("{type_name}.{}", field.name);

            if !field.directives.inaccessible {
                reference(&field.ty, coordinate);
            } else if field.ty.is_required() && field.default_value.is_none() {
                diagnostics.push_fatal(
                    DiagnosticKind::Merge,
                    format!(
                        r#"The input field "{}" defined at coordinates "{coordinate}" is declared "@inaccessible"; however, it is a required field of input object "{type_name}"."#,
                        field.name
                    ),
                );
            }
        }
    }

    for (type_name, coordinates) in references {
        let kind = schema.get(&type_name).map(|ty| ty.kind.to_string()).unwrap_or_default();

        diagnostics.push_fatal(
            DiagnosticKind::Merge,
            format!(
                r#"The {kind} "{type_name}" is declared "@inaccessible"; however, the {kind} is still referenced at the following paths: {}."#,
                coordinates.iter().map(|coordinate| format!(r#""{coordinate}""#)).join(", ")
            ),
        );
    }
}

/// What kind of child definitions are all hidden, if they are.
fn all_children_inaccessible(schema: &Schema, definition: &TypeDefinition) -> Option<&'static str> {
    let (children, hidden): (&'static str, Vec<bool>) = match definition.kind {
        TypeKind::Object | TypeKind::Interface => (
            "field",
            definition.fields.values().map(|field| field.directives.inaccessible).collect(),
        ),
        TypeKind::Enum => (
            "enum value",
            definition.values.values().map(|value| value.directives.inaccessible).collect(),
        ),
        TypeKind::InputObject => (
            "input field",
            definition.input_fields.values().map(|field| field.directives.inaccessible).collect(),
        ),
        TypeKind::Union => (
            "union member type",
            definition
                .members
                .iter()
                .map(|member| schema.get(member).is_some_and(|ty| ty.directives.inaccessible))
                .collect(),
        ),
        TypeKind::Scalar => return None,
    };

    (!hidden.is_empty() && hidden.into_iter().all(|hidden| hidden)).then_some(children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{EnumValueDefinition, FieldDefinition};

    #[test]
    fn from_toml() {
        let contract: ContractTags = toml::from_str(r#"excludedTags = ["internal", "beta"]"#).unwrap();
        assert_eq!(contract, ContractTags::excluding(["beta", "internal"]));

        let error = toml::from_str::<ContractTags>(r#"tags = ["internal"]"#).unwrap_err();
        insta::assert_snapshot!(error.message(), @"unknown field `tags`, expected `excludedTags` or `includedTags`");
    }

    fn tagged(tag: Option<&str>) -> PersistedDirectives {
        PersistedDirectives {
            tags: tag.map(|tag| BTreeSet::from([tag.to_owned()])).unwrap_or_default(),
            ..Default::default()
        }
    }

    fn color(values: &[(&str, Option<&str>)]) -> Schema {
        let mut definition = TypeDefinition::new("Color", TypeKind::Enum);

        for (name, tag) in values {
            definition.values.insert(
                (*name).to_owned(),
                EnumValueDefinition {
                    name: (*name).to_owned(),
                    description: None,
                    directives: tagged(*tag),
                },
            );
        }

        let mut query = TypeDefinition::new("Query", TypeKind::Object);
        query.fields.insert(
            "color".to_owned(),
            FieldDefinition {
                name: "color".to_owned(),
                ty: FieldType::named("Color"),
                arguments: Default::default(),
                description: None,
                directives: PersistedDirectives::default(),
            },
        );

        Schema {
            types: BTreeMap::from([("Color".to_owned(), definition), ("Query".to_owned(), query)]),
        }
    }

    #[test]
    fn excluding_every_child_hides_the_parent() {
        let mut schema = color(&[("RED", Some("internal")), ("BLUE", Some("internal"))]);
        apply(&mut schema, &ContractTags::excluding(["internal"]));

        assert!(schema.types["Color"].directives.inaccessible);

        let mut diagnostics = Diagnostics::default();
        client_schema(&schema, &mut diagnostics);

        assert_eq!(
            diagnostics.iter_errors().collect::<Vec<_>>(),
            [r#"The enum "Color" is declared "@inaccessible"; however, the enum is still referenced at the following paths: "Query.color"."#]
        );
    }

    #[test]
    fn including_hides_untagged_children() {
        let mut schema = color(&[("RED", Some("public")), ("BLUE", Some("internal")), ("GREEN", None)]);
        apply(&mut schema, &ContractTags::including(["public"]));

        let values = &schema.types["Color"].values;

        assert!(!schema.types["Color"].directives.inaccessible);
        assert!(!values["RED"].directives.inaccessible);
        assert!(values["BLUE"].directives.inaccessible);
        assert!(values["GREEN"].directives.inaccessible);

        // No child of Query carries a tag: the whole type goes.
        assert!(schema.types["Query"].directives.inaccessible);
        assert!(!schema.types["Query"].fields["color"].directives.inaccessible);
    }

    #[test]
    fn untagged_schemas_have_no_client_schema() {
        let schema = color(&[("RED", None)]);
        let mut diagnostics = Diagnostics::default();

        assert_eq!(client_schema(&schema, &mut diagnostics), None);
        assert!(diagnostics.is_empty());
    }
}

//! Selection sets found in `@key(fields:)`, `@requires(fields:)` and `@provides(fields:)`.

use crate::ast::{Schema, TypeKind};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct FieldSet(Vec<Selection>);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum Selection {
    Field { name: String, subselection: FieldSet },
    InlineFragment { on: String, subselection: FieldSet },
}

impl FieldSet {
    /// Parse the `fields` argument of a directive as a selection set. Arguments, directives and
    /// fragment spreads are rejected. Selections are kept in canonical order, so equal sets
    /// compare and print the same.
    pub(crate) fn parse(fields: &str, directive_name: &str) -> Result<FieldSet, String> {
        use cynic_parser::executable as ast;

        let fields = format!("{{ {fields} }}");
        let parsed = cynic_parser::parse_executable_document(&fields).map_err(|err| {
            format!("could not parse the `fields` argument in `@{directive_name}` as a selection set: {err}")
        })?;

        let mut operations = parsed.operations();

        let (Some(operation), None, None) = (operations.next(), operations.next(), parsed.fragments().next()) else {
            return Err(format!(
                "the `fields` argument in `@{directive_name}` must be a single selection set"
            ));
        };

        fn build_selection_set(selections: ast::Iter<'_, ast::Selection<'_>>) -> Result<FieldSet, String> {
            selections
                .map(|selection| match selection {
                    ast::Selection::Field(item) => {
                        if item.arguments().next().is_some() {
                            return Err(format!("arguments are not allowed (on `{}`)", item.name()));
                        }
                        if item.directives().next().is_some() {
                            return Err(format!("directives are not allowed (on `{}`)", item.name()));
                        }
                        if item.alias().is_some() {
                            return Err(format!("aliases are not allowed (on `{}`)", item.name()));
                        }

                        Ok(Selection::Field {
                            name: item.name().to_owned(),
                            subselection: build_selection_set(item.selection_set())?,
                        })
                    }
                    ast::Selection::InlineFragment(fragment) => {
                        let on = fragment
                            .type_condition()
                            .ok_or("inline fragments must have a type condition")?;

                        if fragment.directives().next().is_some() {
                            return Err(format!("directives are not allowed (on `... on {on}`)"));
                        }

                        Ok(Selection::InlineFragment {
                            on: on.to_owned(),
                            subselection: build_selection_set(fragment.selection_set())?,
                        })
                    }
                    ast::Selection::FragmentSpread(_) => Err("fragment spreads are not allowed".to_owned()),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(|mut selections| {
                    selections.sort();
                    selections.dedup();
                    FieldSet(selections)
                })
        }

        let selection_set = build_selection_set(operation.selection_set())
            .map_err(|error| format!("the `fields` argument in `@{directive_name}` was invalid: {error}"))?;

        if selection_set.is_empty() {
            return Err(format!(
                "the `fields` argument in `@{directive_name}` must select at least one field"
            ));
        }

        Ok(selection_set)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Names of the fields selected at the top level, inline fragments excluded.
    pub(crate) fn field_names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter_map(|selection| match selection {
            Selection::Field { name, .. } => Some(name.as_str()),
            Selection::InlineFragment { .. } => None,
        })
    }

    /// The subselection of the field `name` when this field set is applied to `type_name`: the
    /// field is selected directly, or in an inline fragment on that type.
    pub(crate) fn subselection(&self, type_name: &str, name: &str) -> Option<&FieldSet> {
        self.0.iter().find_map(|selection| match selection {
            Selection::Field {
                name: selected,
                subselection,
            } if selected == name => Some(subselection),
            Selection::InlineFragment { on, subselection } if on == type_name => {
                subselection.subselection(type_name, name)
            }
            _ => None,
        })
    }

    /// Check every selected field exists on the type it is selected on, and that composite
    /// fields have a subselection while leaf fields don't. Returns the path of the offending
    /// selection with the error.
    pub(crate) fn validate(&self, schema: &Schema, parent_type_name: &str) -> Result<(), String> {
        let mut path = vec![parent_type_name.to_owned()];
        self.validate_inner(schema, parent_type_name, &mut path)
    }

    fn validate_inner(&self, schema: &Schema, parent_type_name: &str, path: &mut Vec<String>) -> Result<(), String> {
        let Some(parent) = schema.get(parent_type_name) else {
            return Err(format!("the type `{parent_type_name}` is not defined"));
        };

        for selection in &self.0 {
            match selection {
                Selection::Field { name, subselection } => {
                    path.push(name.clone());

                    let Some(field) = parent.fields.get(name) else {
                        return Err(format!(
                            "the `{name}` field does not exist on `{parent_type_name}` (at {})",
                            path.join(".")
                        ));
                    };

                    let is_composite = schema.is_composite(&field.ty.name);

                    match (is_composite, subselection.is_empty()) {
                        (true, true) => {
                            return Err(format!(
                                "the `{}` field is of composite type `{}` and must have a subselection",
                                path.join("."),
                                field.ty.name
                            ))
                        }
                        (false, false) => {
                            return Err(format!(
                                "the `{}` field is of leaf type `{}` and cannot have a subselection",
                                path.join("."),
                                field.ty.name
                            ))
                        }
                        (true, false) => subselection.validate_inner(schema, &field.ty.name, path)?,
                        (false, true) => (),
                    }

                    path.pop();
                }
                Selection::InlineFragment { on, subselection } => {
                    let Some(fragment_type) = schema.get(on) else {
                        return Err(format!("the type condition `{on}` refers to an undefined type"));
                    };

                    if !matches!(fragment_type.kind, TypeKind::Object | TypeKind::Interface) {
                        return Err(format!("the type condition `{on}` must be an object or interface"));
                    }

                    path.push(format!("... on {on}"));
                    subselection.validate_inner(schema, on, path)?;
                    path.pop();
                }
            }
        }

        Ok(())
    }
}

impl fmt::Display for FieldSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, selection) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(" ")?;
            }

            let subselection = match selection {
                Selection::Field { name, subselection } => {
                    f.write_str(name)?;
                    subselection
                }
                Selection::InlineFragment { on, subselection } => {
                    write!(f, "... on {on}")?;
                    subselection
                }
            };

            if !subselection.is_empty() {
                write!(f, " {{ {subselection} }}")?;
            }
        }

        Ok(())
    }
}

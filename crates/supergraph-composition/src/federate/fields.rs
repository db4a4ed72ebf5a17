use super::*;
use crate::ast::{FieldDefinition, FieldType, InputValueDefinition, Value};
use indexmap::IndexMap;

/// Merge the definitions of one object or interface field across subgraphs. Returns `None` when
/// the field cannot be part of the supergraph; the reason has been reported.
pub(super) fn merge_output_field(
    ctx: &mut Context<'_>,
    type_name: &str,
    field_name: &str,
    fields: &[(usize, &FieldDefinition)],
    check_shareability: bool,
) -> Option<FieldDefinition> {
    let ty = compose_output_field_types(ctx, type_name, field_name, fields)?;

    let subgraphs = ctx.subgraphs;
    let is_external = |subgraph_idx: usize| subgraphs[subgraph_idx].is_external(type_name, field_name);

    if fields.iter().all(|(subgraph_idx, _)| is_external(*subgraph_idx)) {
        ctx.push_error(format!(
            r#"The field "{type_name}.{field_name}" is marked @external in every subgraph that defines it ({}). At least one subgraph must resolve it."#,
            subgraph_list(ctx, fields.iter().map(|(idx, _)| *idx)),
        ));
        return None;
    }

    let overridden_from = collect_overrides(ctx, type_name, field_name, fields);

    let resolvable_in: Vec<usize> = fields
        .iter()
        .map(|(subgraph_idx, _)| *subgraph_idx)
        .filter(|subgraph_idx| !is_external(*subgraph_idx) && !overridden_from.contains(subgraph_idx))
        .collect();

    if check_shareability && resolvable_in.len() > 1 {
        let not_shareable: Vec<usize> = resolvable_in
            .iter()
            .copied()
            .filter(|subgraph_idx| !subgraphs[*subgraph_idx].is_shareable(type_name, field_name))
            .collect();

        if !not_shareable.is_empty() {
            ctx.push_error(format!(
                r#"The field "{type_name}.{field_name}" is resolvable in several subgraphs ({}) but is not marked @shareable in {}."#,
                subgraph_list(ctx, resolvable_in.iter().copied()),
                subgraph_list(ctx, not_shareable.into_iter()),
            ));
        }
    }

    for subgraph_idx in resolvable_in {
        ctx.add_origin(type_name, field_name, subgraph_idx);
    }

    let mut merged = FieldDefinition {
        name: field_name.to_owned(),
        ty,
        arguments: IndexMap::new(),
        description: None,
        directives: Default::default(),
    };

    for (_, field) in fields {
        if merged.description.is_none() {
            merged.description.clone_from(&field.description);
        }

        merged.directives.merge(&field.directives);
    }

    merged.arguments = merge_arguments(ctx, type_name, field_name, fields);

    Some(merged)
}

/// The least required type all subgraphs agree on. The first incompatible pair is reported and
/// nothing else about the field is.
fn compose_output_field_types(
    ctx: &mut Context<'_>,
    type_name: &str,
    field_name: &str,
    fields: &[(usize, &FieldDefinition)],
) -> Option<FieldType> {
    let ((first_idx, first), rest) = fields.split_first()?;
    let mut composed = first.ty.clone();

    for (subgraph_idx, field) in rest {
        match composed.compose_for_output(&field.ty) {
            Some(ty) => composed = ty,
            None => {
                ctx.push_error(format!(
                    r#"The field "{type_name}.{field_name}" has incompatible types in subgraphs "{}" ({}) and "{}" ({})."#,
                    ctx.subgraph_name(*first_idx),
                    first.ty,
                    ctx.subgraph_name(*subgraph_idx),
                    field.ty,
                ));
                return None;
            }
        }
    }

    Some(composed)
}

/// Validate the `@override` directives on a field. Returns the subgraphs the field was taken
/// away from.
fn collect_overrides(
    ctx: &mut Context<'_>,
    type_name: &str,
    field_name: &str,
    fields: &[(usize, &FieldDefinition)],
) -> Vec<usize> {
    let subgraphs = ctx.subgraphs;
    let overriding: Vec<(usize, &str)> = fields
        .iter()
        .filter_map(|(subgraph_idx, _)| {
            subgraphs[*subgraph_idx]
                .field_federation(type_name, field_name)
                .and_then(|field| field.override_from.as_deref())
                .map(|from| (*subgraph_idx, from))
        })
        .collect();

    if overriding.len() > 1 {
        ctx.push_error(format!(
            r#"Field "{type_name}.{field_name}" is marked with directive @override in more than one subgraph ({}). Only one @override directive is allowed per field."#,
            subgraph_list(ctx, overriding.iter().map(|(idx, _)| *idx)),
        ));
        return Vec::new();
    }

    let mut overridden_from = Vec::new();

    for (subgraph_idx, from) in overriding {
        match ctx.subgraph_idx_by_name(from) {
            Some(from_idx) => {
                overridden_from.push(from_idx);
                ctx.overrides.push((from_idx, type_name.to_owned(), field_name.to_owned()));
            }
            None => ctx.push_warning(format!(
                r#"The field "{type_name}.{field_name}" in "{}" overrides the subgraph "{from}", which is not part of the composition."#,
                ctx.subgraph_name(subgraph_idx),
            )),
        }
    }

    overridden_from
}

/// The arguments of a supergraph field are the intersection of the subgraphs' arguments for
/// that field.
pub(super) fn merge_arguments(
    ctx: &mut Context<'_>,
    type_name: &str,
    field_name: &str,
    fields: &[(usize, &FieldDefinition)],
) -> IndexMap<String, InputValueDefinition> {
    let mut by_name: BTreeMap<&str, Vec<(usize, &InputValueDefinition)>> = BTreeMap::new();

    for (subgraph_idx, field) in fields {
        for argument in field.arguments.values() {
            by_name
                .entry(argument.name.as_str())
                .or_default()
                .push((*subgraph_idx, argument));
        }
    }

    let mut merged = IndexMap::new();

    for (argument_name, arguments) in by_name {
        let location = format!("{type_name}.{field_name}({argument_name}:)");

        if arguments.len() < fields.len() {
            if let Some((required_in, _)) = arguments.iter().find(|(_, argument)| argument.ty.is_required()) {
                let missing_in = fields
                    .iter()
                    .map(|(idx, _)| *idx)
                    .filter(|idx| !arguments.iter().any(|(defined_in, _)| defined_in == idx));

                ctx.push_error(format!(
                    r#"The argument "{location}" is required in "{}" but missing in {}."#,
                    ctx.subgraph_name(*required_in),
                    subgraph_list(ctx, missing_in),
                ));
            }

            continue;
        }

        if let Some(argument) = merge_input_values(ctx, &location, &arguments) {
            merged.insert(argument_name.to_owned(), argument);
        }
    }

    merged
}

/// Merge argument or input field definitions that every subgraph agrees exist: the most
/// required type wins, and defaults must not conflict.
pub(super) fn merge_input_values(
    ctx: &mut Context<'_>,
    location: &str,
    values: &[(usize, &InputValueDefinition)],
) -> Option<InputValueDefinition> {
    let ((first_idx, first), rest) = values.split_first()?;
    let mut ty = first.ty.clone();

    for (subgraph_idx, value) in rest {
        match ty.compose_for_input(&value.ty) {
            Some(composed) => ty = composed,
            None => {
                ctx.push_error(format!(
                    r#"The "{location}" input value has incompatible types in subgraphs "{}" ({}) and "{}" ({})."#,
                    ctx.subgraph_name(*first_idx),
                    first.ty,
                    ctx.subgraph_name(*subgraph_idx),
                    value.ty,
                ));
                return None;
            }
        }
    }

    let mut merged = InputValueDefinition {
        name: first.name.clone(),
        ty,
        default_value: compose_defaults(ctx, location, values),
        description: None,
        directives: Default::default(),
    };

    for (_, value) in values {
        if merged.description.is_none() {
            merged.description.clone_from(&value.description);
        }

        merged.directives.merge(&value.directives);
    }

    Some(merged)
}

/// Between the subgraphs that define a default on the same input value, the default must be the
/// same. Other subgraphs can omit it.
fn compose_defaults(
    ctx: &mut Context<'_>,
    location: &str,
    values: &[(usize, &InputValueDefinition)],
) -> Option<Value> {
    let mut default: Option<(&Value, usize)> = None;

    for (subgraph_idx, value) in values {
        let Some(value) = &value.default_value else { continue };

        match default {
            None => default = Some((value, *subgraph_idx)),
            Some((existing, _)) if existing == value => (),
            Some((existing, existing_idx)) => ctx.push_error(format!(
                r#"The "{location}" input value has incompatible defaults in subgraphs "{}" ({existing}) and "{}" ({value})."#,
                ctx.subgraph_name(existing_idx),
                ctx.subgraph_name(*subgraph_idx),
            )),
        }
    }

    default.map(|(value, _)| value.clone())
}

pub(super) fn subgraph_list(ctx: &Context<'_>, subgraphs: impl Iterator<Item = usize>) -> String {
    subgraphs
        .map(|subgraph_idx| format!(r#""{}""#, ctx.subgraph_name(subgraph_idx)))
        .join(", ")
}

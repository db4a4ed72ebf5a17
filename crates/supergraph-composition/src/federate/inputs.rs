use super::{
    fields::{merge_input_values, subgraph_list},
    *,
};
use crate::ast::InputValueDefinition;

/// Input object fields are intersected: a field is only part of the supergraph if every subgraph
/// defining the input object has it.
pub(super) fn merge_input_object(ctx: &mut Context<'_>, type_name: &str, definitions: &[(usize, &TypeDefinition)]) {
    let mut merged = TypeDefinition::new(type_name, TypeKind::InputObject);
    let mut fields: BTreeMap<&str, Vec<(usize, &InputValueDefinition)>> = BTreeMap::new();

    for (subgraph_idx, definition) in definitions {
        merge_type_metadata(&mut merged, definition);

        for field in definition.input_fields.values() {
            fields
                .entry(field.name.as_str())
                .or_default()
                .push((*subgraph_idx, field));
        }
    }

    for (field_name, fields) in fields {
        let location = format!("{type_name}.{field_name}");

        if fields.len() < definitions.len() {
            if let Some((required_in, _)) = fields
                .iter()
                .find(|(_, field)| field.ty.is_required() && field.default_value.is_none())
            {
                let missing_in = definitions
                    .iter()
                    .map(|(idx, _)| *idx)
                    .filter(|idx| !fields.iter().any(|(defined_in, _)| defined_in == idx));

                ctx.push_error(format!(
                    r#"The input field "{location}" is required in "{}" but missing in {}."#,
                    ctx.subgraph_name(*required_in),
                    subgraph_list(ctx, missing_in),
                ));
            }

            continue;
        }

        if let Some(field) = merge_input_values(ctx, &location, &fields) {
            merged.input_fields.insert(field_name.to_owned(), field);
        }
    }

    if merged.input_fields.is_empty() {
        ctx.push_error(format!(
            r#"The input object "{type_name}" has no field defined in every subgraph ({})."#,
            subgraph_list(ctx, definitions.iter().map(|(idx, _)| *idx)),
        ));
        return;
    }

    ctx.insert_type(merged);
}

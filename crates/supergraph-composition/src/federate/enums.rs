use super::*;

/// Enums must declare the same values in every subgraph.
pub(super) fn merge_enum(ctx: &mut Context<'_>, type_name: &str, definitions: &[(usize, &TypeDefinition)]) {
    let mut merged = TypeDefinition::new(type_name, TypeKind::Enum);

    let Some((first_idx, first)) = definitions.first() else {
        return;
    };

    let expected: BTreeSet<&str> = first.values.keys().map(String::as_str).collect();
    let mut mismatches = Vec::new();

    for (subgraph_idx, definition) in definitions {
        merge_type_metadata(&mut merged, definition);

        let values: BTreeSet<&str> = definition.values.keys().map(String::as_str).collect();

        if values != expected {
            mismatches.push(format!(
                r#""{}" defines [{}]"#,
                ctx.subgraph_name(*subgraph_idx),
                values.iter().join(", ")
            ));
        }

        for value in definition.values.values() {
            match merged.values.get_mut(&value.name) {
                Some(existing) => {
                    if existing.description.is_none() {
                        existing.description.clone_from(&value.description);
                    }
                    existing.directives.merge(&value.directives);
                }
                None => {
                    merged.values.insert(value.name.clone(), value.clone());
                }
            }
        }
    }

    if !mismatches.is_empty() {
        ctx.push_error(format!(
            r#"The enum "{type_name}" must have the same values in every subgraph, but "{}" defines [{}] while {}."#,
            ctx.subgraph_name(*first_idx),
            expected.iter().join(", "),
            mismatches.join(" and "),
        ));
        return;
    }

    ctx.insert_type(merged);
}

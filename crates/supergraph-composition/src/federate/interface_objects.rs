use super::*;

/// A subgraph can contribute fields to an entity interface without knowing its implementations,
/// by declaring an object with the interface's name and `@interfaceObject`. This records the
/// concrete types the router dispatches to, and adds the contributed fields to each of them.
pub(super) fn merge_interface_objects(ctx: &mut Context<'_>) {
    let subgraphs = ctx.subgraphs;

    let interface_names: Vec<String> = ctx
        .schema
        .types
        .values()
        .filter(|ty| ty.kind == TypeKind::Interface)
        .map(|ty| ty.name.clone())
        .collect();

    for interface_name in interface_names {
        let object_subgraphs: Vec<usize> = (0..subgraphs.len())
            .filter(|idx| subgraphs[*idx].is_interface_object(&interface_name))
            .collect();

        if object_subgraphs.is_empty() {
            continue;
        }

        let interface_subgraphs: Vec<usize> = (0..subgraphs.len())
            .filter(|idx| {
                subgraphs[*idx]
                    .schema
                    .get(&interface_name)
                    .is_some_and(|ty| ty.kind == TypeKind::Interface)
            })
            .collect();

        if interface_subgraphs.is_empty() {
            ctx.push_error(format!(
                r#"The @interfaceObject "{interface_name}" in {} does not correspond to an entity interface in any other subgraph."#,
                fields::subgraph_list(ctx, object_subgraphs.iter().copied()),
            ));
            continue;
        }

        if let Some(idx) = interface_subgraphs
            .iter()
            .copied()
            .find(|idx| !subgraphs[*idx].is_entity(&interface_name))
        {
            ctx.push_error(format!(
                r#"The interface "{interface_name}" is used as an @interfaceObject, so it must declare a @key in "{}"."#,
                ctx.subgraph_name(idx),
            ));
        }

        let concrete_types: BTreeSet<String> = interface_subgraphs
            .iter()
            .flat_map(|idx| subgraphs[*idx].schema.implementers(&interface_name))
            .map(|implementer| implementer.name.clone())
            .collect();

        for object_subgraph in &object_subgraphs {
            for concrete_type in &concrete_types {
                if subgraphs[*object_subgraph].schema.get(concrete_type).is_some() {
                    ctx.push_error(format!(
                        r#"[{}] The subgraph declares "{interface_name}" as an @interfaceObject, so it must not define its implementation "{concrete_type}"."#,
                        ctx.subgraph_name(*object_subgraph),
                    ));
                }
            }
        }

        propagate_fields(ctx, &interface_name, &object_subgraphs, &concrete_types);

        ctx.entity_interface_concrete_types
            .insert(interface_name, concrete_types);
    }
}

/// Fields resolvable by an interface object subgraph are resolvable on every implementation.
fn propagate_fields(
    ctx: &mut Context<'_>,
    interface_name: &str,
    object_subgraphs: &[usize],
    concrete_types: &BTreeSet<String>,
) {
    let subgraphs = ctx.subgraphs;

    for &subgraph_idx in object_subgraphs {
        let Some(interface_object) = subgraphs[subgraph_idx].schema.get(interface_name) else {
            continue;
        };

        for field_name in interface_object.fields.keys() {
            if subgraphs[subgraph_idx].is_external(interface_name, field_name) {
                continue;
            }

            let Some(field) = ctx.schema.field(interface_name, field_name).cloned() else {
                continue;
            };

            for concrete_type in concrete_types {
                let Some(object) = ctx.schema.types.get_mut(concrete_type) else {
                    continue;
                };

                object
                    .fields
                    .entry(field_name.clone())
                    .or_insert_with(|| field.clone());

                ctx.add_origin(concrete_type, field_name, subgraph_idx);
            }
        }
    }
}

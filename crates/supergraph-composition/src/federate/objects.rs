use super::{fields::merge_output_field, *};
use crate::ast::FieldDefinition;

pub(super) fn merge_object(ctx: &mut Context<'_>, type_name: &str, definitions: &[(usize, &TypeDefinition)]) {
    let merged = merge_fields(ctx, TypeKind::Object, type_name, definitions);
    ctx.insert_type(merged);
}

/// Entity interfaces and the interface objects standing for them are merged together: fields
/// contributed by interface objects belong to the interface.
pub(super) fn merge_interface(ctx: &mut Context<'_>, type_name: &str, definitions: &[(usize, &TypeDefinition)]) {
    let merged = merge_fields(ctx, TypeKind::Interface, type_name, definitions);
    ctx.insert_type(merged);
}

fn merge_fields(
    ctx: &mut Context<'_>,
    kind: TypeKind,
    type_name: &str,
    definitions: &[(usize, &TypeDefinition)],
) -> TypeDefinition {
    let mut merged = TypeDefinition::new(type_name, kind);
    let mut fields: BTreeMap<&str, Vec<(usize, &FieldDefinition)>> = BTreeMap::new();

    for (subgraph_idx, definition) in definitions {
        merge_type_metadata(&mut merged, definition);

        // Interface objects are objects in their subgraph, but don't implement anything in the
        // supergraph.
        if definition.kind == kind {
            merged.interfaces.extend(definition.interfaces.iter().cloned());
        }

        for field in definition.fields.values() {
            fields
                .entry(field.name.as_str())
                .or_default()
                .push((*subgraph_idx, field));
        }
    }

    let check_shareability = kind == TypeKind::Object;

    for (field_name, fields) in fields {
        if let Some(field) = merge_output_field(ctx, type_name, field_name, &fields, check_shareability) {
            merged.fields.insert(field_name.to_owned(), field);
        }
    }

    merged
}

/// Every object implementing an interface in the supergraph must have all of the interface's
/// fields.
pub(super) fn validate_interface_implementations(ctx: &mut Context<'_>) {
    let mut errors = Vec::new();

    for object in ctx.schema.types.values().filter(|ty| ty.kind == TypeKind::Object) {
        for interface_name in &object.interfaces {
            let Some(interface) = ctx.schema.get(interface_name) else {
                continue;
            };

            if interface.kind != TypeKind::Interface {
                errors.push(format!(
                    r#"The object "{}" implements "{interface_name}", which is an {} in the supergraph."#,
                    object.name, interface.kind
                ));
                continue;
            }

            for field_name in interface.fields.keys() {
                if !object.fields.contains_key(field_name) {
                    errors.push(format!(
                        r#"The object "{}" implements the interface "{interface_name}" but is missing its field "{field_name}"."#,
                        object.name
                    ));
                }
            }
        }
    }

    for error in errors {
        ctx.push_error(error);
    }
}

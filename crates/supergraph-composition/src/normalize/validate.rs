use super::*;
use crate::ast::BUILTIN_SCALARS;

pub(super) fn validate_subgraph(ctx: &mut Context<'_>) {
    let mut errors = Vec::new();

    for definition in ctx.schema.types.values() {
        let type_name = definition.name.as_str();

        for interface in &definition.interfaces {
            match ctx.schema.get(interface) {
                Some(implemented) if implemented.kind == TypeKind::Interface => (),
                Some(implemented) => errors.push(format!(
                    "The type `{type_name}` implements `{interface}`, which is an {} and not an interface.",
                    implemented.kind
                )),
                None => errors.push(format!(
                    "The type `{type_name}` implements the undefined interface `{interface}`."
                )),
            }
        }

        for member in &definition.members {
            match ctx.schema.get(member) {
                Some(member_definition) if member_definition.kind == TypeKind::Object => (),
                Some(member_definition) => errors.push(format!(
                    "The union `{type_name}` has the member `{member}`, which is an {} and not an object.",
                    member_definition.kind
                )),
                None => errors.push(format!("The union `{type_name}` has the undefined member `{member}`.")),
            }
        }

        for field in definition.fields.values() {
            let location = format!("{type_name}.{}", field.name);
            check_type_reference(&ctx.schema, &location, &field.ty.name, TypePosition::Output, &mut errors);

            for argument in field.arguments.values() {
                let location = format!("{location}({}:)", argument.name);
                check_type_reference(&ctx.schema, &location, &argument.ty.name, TypePosition::Input, &mut errors);
            }
        }

        for input_field in definition.input_fields.values() {
            let location = format!("{type_name}.{}", input_field.name);
            check_type_reference(&ctx.schema, &location, &input_field.ty.name, TypePosition::Input, &mut errors);
        }
    }

    for (type_name, federation) in &ctx.federation {
        let Some(definition) = ctx.schema.get(type_name) else {
            continue;
        };

        if !federation.keys.is_empty() && !matches!(definition.kind, TypeKind::Object | TypeKind::Interface) {
            errors.push(format!(
                "The @key directive is only allowed on objects and interfaces, but `{type_name}` is an {}.",
                definition.kind
            ));
            continue;
        }

        for key in &federation.keys {
            if let Err(error) = key.fields.validate(&ctx.schema, type_name) {
                errors.push(format!("Error in @key at {type_name}: {error}"));
            }
        }

        if federation.interface_object {
            if definition.kind != TypeKind::Object {
                errors.push(format!(
                    "The @interfaceObject directive is only allowed on objects, but `{type_name}` is an {}.",
                    definition.kind
                ));
            } else if federation.keys.is_empty() {
                errors.push(format!(
                    "The @interfaceObject `{type_name}` must declare at least one @key."
                ));
            }
        }

        for (field_name, field) in &federation.fields {
            if let Some(requires) = &field.requires {
                if let Err(error) = requires.validate(&ctx.schema, type_name) {
                    errors.push(format!("Error in @requires at {type_name}.{field_name}: {error}"));
                }
            }

            let Some(provides) = &field.provides else { continue };
            let Some(field_definition) = definition.fields.get(field_name) else {
                continue;
            };

            if !ctx.schema.is_composite(&field_definition.ty.name) {
                errors.push(format!(
                    "Error in @provides at {type_name}.{field_name}: the field returns `{}`, which is not an object, interface or union.",
                    field_definition.ty.name
                ));
                continue;
            }

            if let Err(error) = provides.validate(&ctx.schema, &field_definition.ty.name) {
                errors.push(format!("Error in @provides at {type_name}.{field_name}: {error}"));
            }
        }
    }

    for error in errors {
        ctx.push_error(error);
    }
}

#[derive(Clone, Copy)]
enum TypePosition {
    Input,
    Output,
}

fn check_type_reference(schema: &Schema, location: &str, type_name: &str, position: TypePosition, errors: &mut Vec<String>) {
    if BUILTIN_SCALARS.contains(&type_name) {
        return;
    }

    let Some(definition) = schema.get(type_name) else {
        errors.push(format!("The type `{type_name}` referenced at `{location}` is not defined."));
        return;
    };

    let valid = match position {
        TypePosition::Input => matches!(
            definition.kind,
            TypeKind::Scalar | TypeKind::Enum | TypeKind::InputObject
        ),
        TypePosition::Output => definition.kind != TypeKind::InputObject,
    };

    if !valid {
        let expected = match position {
            TypePosition::Input => "an input type",
            TypePosition::Output => "an output type",
        };

        errors.push(format!(
            "The type of `{location}` must be {expected}, but `{type_name}` is an {}.",
            definition.kind
        ));
    }
}

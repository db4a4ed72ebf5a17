use super::{directives::TypeDirectives, *};
use crate::ast::{
    EnumValueDefinition, FieldDefinition, FieldType, InputValueDefinition, TypeDefinition, Value, Wrapping,
    BUILTIN_SCALARS,
};
use cynic_parser::ConstValue;
use indexmap::IndexMap;

pub(super) fn ingest_definitions(ctx: &mut Context<'_>, document: &ast::TypeSystemDocument) {
    for definition in document.definitions() {
        match definition {
            ast::Definition::Type(type_definition) => ingest_type_definition(ctx, type_definition, false),
            ast::Definition::TypeExtension(type_definition) => ingest_type_definition(ctx, type_definition, true),
            ast::Definition::Schema(_) | ast::Definition::SchemaExtension(_) | ast::Definition::Directive(_) => (),
        }
    }
}

fn ingest_type_definition(ctx: &mut Context<'_>, type_definition: ast::TypeDefinition<'_>, is_extension: bool) {
    let source_name = type_definition.name();

    if is_federation_internal_type(source_name) {
        return;
    }

    let kind = match type_definition {
        ast::TypeDefinition::Object(_) => TypeKind::Object,
        ast::TypeDefinition::Interface(_) => TypeKind::Interface,
        ast::TypeDefinition::Union(_) => TypeKind::Union,
        ast::TypeDefinition::Enum(_) => TypeKind::Enum,
        ast::TypeDefinition::Scalar(_) => TypeKind::Scalar,
        ast::TypeDefinition::InputObject(_) => TypeKind::InputObject,
    };

    if kind == TypeKind::Scalar && BUILTIN_SCALARS.contains(&source_name) {
        return;
    }

    if ctx.roots.shadows_root_name(source_name) {
        ctx.push_error(format!(
            "The {source_name} type has the default name for a root but is itself not a root. This is not valid in a federation context."
        ));
        return;
    }

    let name = ctx.roots.rename(source_name).to_owned();
    let directives = directives::ingest_type_directives(ctx, &name, type_definition.directives());
    let is_extension = is_extension || directives.extends;

    if !is_extension && !ctx.defined_types.insert(name.clone()) {
        ctx.push_error(format!("The type `{name}` is defined more than once."));
        return;
    }

    let definition = ctx
        .schema
        .types
        .entry(name.clone())
        .or_insert_with(|| TypeDefinition::new(name.clone(), kind));

    if definition.kind != kind {
        let existing_kind = definition.kind;
        ctx.push_error(format!(
            "The type `{name}` is declared both as an {existing_kind} and as an {kind}."
        ));
        return;
    }

    if definition.description.is_none() {
        definition.description = type_definition
            .description()
            .map(|description| description.to_cow().into_owned());
    }

    definition.directives.merge(&directives.persisted);

    let TypeDirectives {
        keys,
        shareable,
        interface_object,
        external,
        ..
    } = directives;

    let federation = ctx.federation.entry(name.clone()).or_default();
    federation.keys.extend(keys);
    federation.shareable |= shareable;
    federation.interface_object |= interface_object;

    match type_definition {
        ast::TypeDefinition::Object(object) => {
            ingest_interfaces(ctx, &name, object.implements_interfaces());
            ingest_fields(ctx, &name, object.fields(), external);
        }
        ast::TypeDefinition::Interface(interface) => {
            ingest_interfaces(ctx, &name, interface.implements_interfaces());
            ingest_fields(ctx, &name, interface.fields(), external);
        }
        ast::TypeDefinition::Union(union) => {
            for member in union.members() {
                let member_name = ctx.roots.rename(member.name()).to_owned();
                let Some(definition) = ctx.schema.types.get_mut(&name) else { return };

                if !definition.members.insert(member_name) {
                    let message = format!("The union `{name}` includes the member `{}` more than once.", member.name());
                    ctx.push_error(message);
                }
            }
        }
        ast::TypeDefinition::Enum(enum_definition) => {
            for value in enum_definition.values() {
                let value_name = value.value();
                let location = format!("{name}.{value_name}");
                let directives = directives::ingest_value_directives(ctx, &location, value.directives());
                let description = value.description().map(|description| description.to_cow().into_owned());

                let Some(definition) = ctx.schema.types.get_mut(&name) else { return };

                if definition.values.contains_key(value_name) {
                    ctx.push_error(format!("The enum value `{location}` is defined more than once."));
                    continue;
                }

                definition.values.insert(
                    value_name.to_owned(),
                    EnumValueDefinition {
                        name: value_name.to_owned(),
                        description,
                        directives,
                    },
                );
            }
        }
        ast::TypeDefinition::InputObject(input_object) => {
            for field in input_object.fields() {
                let location = format!("{name}.{}", field.name());
                let input_value = ingest_input_value(ctx, &location, field);

                let Some(definition) = ctx.schema.types.get_mut(&name) else { return };

                if definition.input_fields.contains_key(&input_value.name) {
                    ctx.push_error(format!("The input field `{location}` is defined more than once."));
                    continue;
                }

                definition.input_fields.insert(input_value.name.clone(), input_value);
            }
        }
        ast::TypeDefinition::Scalar(_) => (),
    }
}

fn ingest_interfaces<'a>(ctx: &mut Context<'_>, type_name: &str, interfaces: impl Iterator<Item = &'a str>) {
    for interface in interfaces {
        let Some(definition) = ctx.schema.types.get_mut(type_name) else { return };

        if !definition.interfaces.insert(interface.to_owned()) {
            ctx.push_error(format!(
                "The type `{type_name}` implements the interface `{interface}` more than once."
            ));
        }
    }
}

fn ingest_fields(
    ctx: &mut Context<'_>,
    type_name: &str,
    fields: ast::iter::Iter<'_, ast::FieldDefinition<'_>>,
    type_is_external: bool,
) {
    for field in fields {
        let field_name = field.name();

        // These are special fields on Query exposed by subgraphs.
        if type_name == "Query" && ["_entities", "_service"].contains(&field_name) {
            continue;
        }

        let argument_names = field.arguments().map(|argument| argument.name()).collect::<Vec<_>>();
        let (directives, mut federation) =
            directives::ingest_field_directives(ctx, type_name, field_name, &argument_names, field.directives());
        federation.external |= type_is_external;

        let mut arguments = IndexMap::new();

        for argument in field.arguments() {
            let location = format!("{type_name}.{field_name}({}:)", argument.name());
            let argument = ingest_input_value(ctx, &location, argument);

            if arguments.contains_key(&argument.name) {
                ctx.push_error(format!("The argument `{location}` is defined more than once."));
                continue;
            }

            arguments.insert(argument.name.clone(), argument);
        }

        let field_definition = FieldDefinition {
            name: field_name.to_owned(),
            ty: ingest_field_type(ctx, field.ty()),
            arguments,
            description: field.description().map(|description| description.to_cow().into_owned()),
            directives,
        };

        let Some(definition) = ctx.schema.types.get_mut(type_name) else { return };

        if definition.fields.contains_key(field_name) {
            ctx.push_error(format!("The field `{type_name}.{field_name}` is defined more than once."));
            continue;
        }

        definition.fields.insert(field_name.to_owned(), field_definition);

        ctx.federation
            .entry(type_name.to_owned())
            .or_default()
            .fields
            .insert(field_name.to_owned(), federation);
    }
}

fn ingest_input_value(ctx: &mut Context<'_>, location: &str, value: ast::InputValueDefinition<'_>) -> InputValueDefinition {
    InputValueDefinition {
        name: value.name().to_owned(),
        ty: ingest_field_type(ctx, value.ty()),
        default_value: value.default_value().map(ast_value_to_value),
        description: value.description().map(|description| description.to_cow().into_owned()),
        directives: directives::ingest_value_directives(ctx, location, value.directives()),
    }
}

fn ingest_field_type(ctx: &Context<'_>, field_type: ast::Type<'_>) -> FieldType {
    use cynic_parser::common::WrappingType;

    let wrappers = field_type.wrappers().collect::<Vec<_>>();
    let mut wrappers = wrappers.into_iter().rev().peekable();

    let mut wrapping = if wrappers.next_if(|w| matches!(w, WrappingType::NonNull)).is_some() {
        Wrapping::default().non_null()
    } else {
        Wrapping::default()
    };

    while wrappers.next().is_some() {
        wrapping = if wrappers.next_if(|w| matches!(w, WrappingType::NonNull)).is_some() {
            wrapping.list_non_null()
        } else {
            wrapping.list()
        }
    }

    FieldType {
        name: ctx.roots.rename(field_type.name()).to_owned(),
        wrapping,
    }
}

pub(crate) fn ast_value_to_value(value: ConstValue<'_>) -> Value {
    match value {
        ConstValue::Null(_) => Value::Null,
        ConstValue::Int(n) => Value::Int(n.as_i64()),
        ConstValue::Float(n) => Value::Float(n.as_f64()),
        ConstValue::String(s) => Value::String(s.as_str().to_owned()),
        ConstValue::Boolean(b) => Value::Boolean(b.value()),
        ConstValue::Enum(e) => Value::Enum(e.name().to_owned()),
        ConstValue::List(l) => Value::List(l.items().map(ast_value_to_value).collect()),
        ConstValue::Object(o) => Value::Object(
            o.fields()
                .map(|field| (field.name().to_owned(), ast_value_to_value(field.value())))
                .collect(),
        ),
    }
}

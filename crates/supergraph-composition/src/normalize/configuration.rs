use super::*;
use crate::configuration::{ConfigurationData, RequiredFieldConfiguration};

/// One entry per object type, and per interface carrying a key (entity interfaces).
pub(super) fn build_configuration_map(ctx: &Context<'_>) -> ConfigurationDataMap {
    let mut map = ConfigurationDataMap::new();

    for definition in ctx.schema.types.values() {
        let type_name = definition.name.as_str();
        let federation = ctx.federation.get(type_name);
        let keys = federation.map(|federation| federation.keys.as_slice()).unwrap_or_default();

        let include = match definition.kind {
            TypeKind::Object => !definition.fields.is_empty(),
            TypeKind::Interface => !keys.is_empty(),
            _ => false,
        };

        if !include {
            continue;
        }

        let mut data = ConfigurationData::new(type_name);
        data.is_root_node = ROOT_TYPE_NAMES.contains(&type_name) || keys.iter().any(|key| key.resolvable);

        for field_name in definition.fields.keys() {
            let field = federation.and_then(|federation| federation.fields.get(field_name));

            if field.is_some_and(|field| field.external) {
                data.external_field_names.insert(field_name.clone());
            } else {
                data.field_names.insert(field_name.clone());
            }

            let Some(field) = field else { continue };

            if let Some(requires) = &field.requires {
                data.requires.push(RequiredFieldConfiguration {
                    field_name: field_name.clone(),
                    selection_set: requires.to_string(),
                    disable_entity_resolver: false,
                });
            }

            if let Some(provides) = &field.provides {
                data.provides.push(RequiredFieldConfiguration {
                    field_name: field_name.clone(),
                    selection_set: provides.to_string(),
                    disable_entity_resolver: false,
                });
            }

            data.events.extend(field.events.iter().cloned());
        }

        for key in keys {
            let key = RequiredFieldConfiguration {
                field_name: String::new(),
                selection_set: key.fields.to_string(),
                disable_entity_resolver: !key.resolvable,
            };

            if !data.keys.contains(&key) {
                data.keys.push(key);
            }
        }

        data.is_interface_object = federation.is_some_and(|federation| federation.interface_object);

        if definition.kind == TypeKind::Interface {
            data.entity_interface_concrete_type_names = ctx
                .schema
                .implementers(type_name)
                .map(|implementer| implementer.name.clone())
                .collect();
        }

        data.requires.sort();
        data.provides.sort();
        data.events.sort();

        map.insert(type_name.to_owned(), data);
    }

    map
}

use super::*;
use crate::{
    configuration::{ConfigurationData, RequiredFieldConfiguration},
    DiagnosticKind,
};

/// Apply federation-wide facts (overrides, interface object implementations) to each
/// subgraph's configuration, and merge them into the supergraph configuration.
pub(super) fn merge_configuration(
    subgraphs: &[NormalizedSubgraph],
    overrides: &[(usize, String, String)],
    entity_interface_concrete_types: &BTreeMap<String, BTreeSet<String>>,
    diagnostics: &mut Diagnostics,
) -> (ConfigurationDataMap, Vec<ConfigurationDataMap>) {
    let mut subgraph_configurations: Vec<ConfigurationDataMap> =
        subgraphs.iter().map(|subgraph| subgraph.configuration.clone()).collect();

    for (from_idx, type_name, field_name) in overrides {
        if let Some(data) = subgraph_configurations[*from_idx].get_mut(type_name) {
            data.field_names.remove(field_name);
        }
    }

    for (interface_name, concrete_types) in entity_interface_concrete_types {
        for configuration in &mut subgraph_configurations {
            if let Some(data) = configuration.get_mut(interface_name) {
                data.entity_interface_concrete_type_names.clone_from(concrete_types);
            }
        }
    }

    let mut merged = ConfigurationDataMap::new();
    let mut field_sets = FieldSetOwners::default();

    for (subgraph, configuration) in subgraphs.iter().zip(&subgraph_configurations) {
        for (type_name, data) in configuration {
            let merged_data = merged
                .entry(type_name.clone())
                .or_insert_with(|| ConfigurationData::new(type_name.clone()));

            merged_data.is_root_node |= data.is_root_node;
            merged_data.field_names.extend(data.field_names.iter().cloned());
            merged_data
                .external_field_names
                .extend(data.external_field_names.iter().cloned());

            for key in &data.keys {
                if !merged_data.keys.contains(key) {
                    merged_data.keys.push(key.clone());
                }
            }

            for (directive, configurations, merged_configurations) in [
                ("requires", &data.requires, &mut merged_data.requires),
                ("provides", &data.provides, &mut merged_data.provides),
            ] {
                for configuration in configurations {
                    if field_sets.check(directive, type_name, configuration, &subgraph.name, diagnostics) {
                        merged_configurations.push(configuration.clone());
                    }
                }
            }

            for event in &data.events {
                if !merged_data.events.contains(event) {
                    merged_data.events.push(event.clone());
                }
            }

            merged_data.is_interface_object |= data.is_interface_object;
            merged_data
                .entity_interface_concrete_type_names
                .extend(data.entity_interface_concrete_type_names.iter().cloned());
        }
    }

    for data in merged.values_mut() {
        let resolved = data.field_names.clone();
        data.external_field_names.retain(|name| !resolved.contains(name));
        data.keys.sort();
        data.requires.sort();
        data.provides.sort();
        data.events.sort();
    }

    (merged, subgraph_configurations)
}

/// The first subgraph declaring a `requires` or `provides` selection set for a field, per
/// directive and field.
#[derive(Default)]
struct FieldSetOwners(BTreeMap<(&'static str, String, String), (String, String)>);

impl FieldSetOwners {
    /// Returns whether the configuration is new and should be added to the merged configuration.
    /// Conflicting selection sets are reported.
    fn check(
        &mut self,
        directive: &'static str,
        type_name: &str,
        configuration: &RequiredFieldConfiguration,
        subgraph_name: &str,
        diagnostics: &mut Diagnostics,
    ) -> bool {
        let key = (directive, type_name.to_owned(), configuration.field_name.clone());

        match self.0.get(&key) {
            None => {
                self.0.insert(
                    key,
                    (configuration.selection_set.clone(), subgraph_name.to_owned()),
                );
                true
            }
            Some((selection_set, _)) if *selection_set == configuration.selection_set => false,
            Some((selection_set, owner)) => {
                diagnostics.push_fatal(
                    DiagnosticKind::Merge,
                    format!(
                        r#"The field "{type_name}.{}" has inconsistent @{directive} selection sets: "{selection_set}" in "{owner}" and "{}" in "{subgraph_name}"."#,
                        configuration.field_name, configuration.selection_set,
                    ),
                );
                false
            }
        }
    }
}

//! Package the merged schema and configuration into the artifact the router consumes.

use crate::{
    ast::{Schema, TypeKind},
    configuration::{ArgumentConfigurationData, ConfigurationDataMap, SubgraphConfiguration, SubscriptionFilterCondition},
    federate::{FieldCoordinate, Federated},
    normalize::NormalizedSubgraph,
    render_sdl::render_sdl,
    RouterCompatibilityVersion,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// The output of a successful composition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FederatedGraph {
    #[serde(skip)]
    ast: Schema,
    schema: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_schema: Option<String>,
    argument_configurations: Vec<ArgumentConfigurationData>,
    configuration: ConfigurationDataMap,
    subgraphs: Vec<SubgraphConfiguration>,
    router_compatibility_version: RouterCompatibilityVersion,
    #[serde(skip)]
    origins: BTreeMap<FieldCoordinate, BTreeSet<String>>,
}

impl FederatedGraph {
    /// The composed schema.
    pub fn ast(&self) -> &Schema {
        &self.ast
    }

    /// The composed schema, rendered as SDL.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// The composed schema without its `@inaccessible` elements, rendered as SDL. `None` when the
    /// supergraph uses neither `@tag` nor `@inaccessible`, in which case clients see [`Self::schema`].
    pub fn client_schema(&self) -> Option<&str> {
        self.client_schema.as_deref()
    }

    /// One entry per object or interface field with arguments, in type then field name order.
    pub fn argument_configurations(&self) -> &[ArgumentConfigurationData] {
        &self.argument_configurations
    }

    /// The merged configuration map.
    pub fn configuration(&self) -> &ConfigurationDataMap {
        &self.configuration
    }

    /// Per-subgraph configuration, in subgraph name order.
    pub fn subgraphs(&self) -> &[SubgraphConfiguration] {
        &self.subgraphs
    }

    pub fn router_compatibility_version(&self) -> RouterCompatibilityVersion {
        self.router_compatibility_version
    }

    /// The names of the subgraphs able to resolve a field of the supergraph.
    pub fn origin_set(&self, type_name: &str, field_name: &str) -> Option<&BTreeSet<String>> {
        self.origins.get(&(type_name.to_owned(), field_name.to_owned()))
    }

    /// Everything the router configuration builder needs, as JSON.
    pub fn router_configuration_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[tracing::instrument(skip_all, fields(version = %version))]
pub(crate) fn emit(
    federated: Federated,
    subgraphs: &[NormalizedSubgraph],
    client_schema: Option<Schema>,
    version: RouterCompatibilityVersion,
) -> FederatedGraph {
    let Federated {
        schema,
        configuration,
        subgraph_configurations,
        origins,
        mut subscription_filters,
    } = federated;

    let subgraphs: Vec<SubgraphConfiguration> = subgraphs
        .iter()
        .zip(subgraph_configurations)
        .map(|(subgraph, configuration_data_map)| SubgraphConfiguration {
            name: subgraph.name.clone(),
            url: subgraph.url.clone(),
            configuration_data_map,
        })
        .collect();

    let argument_configurations = argument_configurations(&schema, &mut subscription_filters);
    let sdl = render_sdl(&schema);

    tracing::debug!(
        argument_configurations = argument_configurations.len(),
        sdl_length = sdl.len(),
        "emitted federated graph"
    );

    FederatedGraph {
        ast: schema,
        schema: sdl,
        client_schema: client_schema.as_ref().map(render_sdl),
        argument_configurations,
        configuration,
        subgraphs,
        router_compatibility_version: version,
        origins,
    }
}

/// Fields with arguments or a subscription filter.
fn argument_configurations(
    schema: &Schema,
    subscription_filters: &mut BTreeMap<FieldCoordinate, SubscriptionFilterCondition>,
) -> Vec<ArgumentConfigurationData> {
    let mut configurations = Vec::new();

    for ty in schema.types.values() {
        if !matches!(ty.kind, TypeKind::Object | TypeKind::Interface) {
            continue;
        }

        for field in ty.fields.values() {
            let subscription_filter_condition = subscription_filters.remove(&(ty.name.clone(), field.name.clone()));

            if field.arguments.is_empty() && subscription_filter_condition.is_none() {
                continue;
            }

            configurations.push(ArgumentConfigurationData {
                type_name: ty.name.clone(),
                field_name: field.name.clone(),
                argument_names: field.arguments.keys().cloned().collect(),
                subscription_filter_condition,
            });
        }
    }

    configurations
}

//! Router-facing configuration records. These are what the router configuration builder reads,
//! serialized as camelCase JSON.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Configuration per type name.
pub type ConfigurationDataMap = BTreeMap<String, ConfigurationData>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationData {
    pub type_name: String,
    /// Root types, and entities the subgraph can resolve from a key.
    pub is_root_node: bool,
    /// Fields the subgraph resolves.
    pub field_names: BTreeSet<String>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub external_field_names: BTreeSet<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<RequiredFieldConfiguration>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<RequiredFieldConfiguration>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub provides: Vec<RequiredFieldConfiguration>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<EventConfiguration>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_interface_object: bool,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub entity_interface_concrete_type_names: BTreeSet<String>,
}

impl ConfigurationData {
    pub fn new(type_name: impl Into<String>) -> Self {
        ConfigurationData {
            type_name: type_name.into(),
            is_root_node: false,
            field_names: BTreeSet::new(),
            external_field_names: BTreeSet::new(),
            keys: Vec::new(),
            requires: Vec::new(),
            provides: Vec::new(),
            events: Vec::new(),
            is_interface_object: false,
            entity_interface_concrete_type_names: BTreeSet::new(),
        }
    }
}

/// A selection set the router fetches before resolving a field (`requires`), gets for free
/// (`provides`), or uses to identify an entity (`keys`, where `field_name` is empty).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredFieldConfiguration {
    pub field_name: String,
    pub selection_set: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub disable_entity_resolver: bool,
}

/// Binds a field to an operation on a messaging system.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventConfiguration {
    pub field_name: String,
    /// The first of `topics`.
    pub topic: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// The provider the router publishes through. Kafka, NATS and Redis events default to
    /// `default`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_type: Option<EventProvider>,
    /// Kafka topics, NATS subjects or Redis channels. They can interpolate field arguments as
    /// `{{ args.name }}`.
    pub topics: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_configuration: Option<NatsStreamConfiguration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Publish,
    Request,
    Subscribe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventProvider {
    Kafka,
    Nats,
    Redis,
}

/// The JetStream consumer a NATS subscription reads from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NatsStreamConfiguration {
    /// Seconds. Zero keeps the consumer until it is deleted.
    pub consumer_inactive_threshold: i64,
    pub consumer_name: String,
    pub stream_name: String,
}

/// The arguments of a field in the supergraph. Arguments are the intersection of the arguments
/// the subgraphs declare.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgumentConfigurationData {
    pub type_name: String,
    pub field_name: String,
    pub argument_names: Vec<String>,
    /// Set on subscription fields with `@openfed__subscriptionFilter`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_filter_condition: Option<SubscriptionFilterCondition>,
}

/// Which events of a subscription the router forwards to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SubscriptionFilterCondition {
    And(Vec<SubscriptionFilterCondition>),
    In(SubscriptionFieldCondition),
    Not(Box<SubscriptionFilterCondition>),
    Or(Vec<SubscriptionFilterCondition>),
}

/// Matches when the leaf at `field_path` in the event equals one of `values`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionFieldCondition {
    pub field_path: Vec<String>,
    pub values: Vec<serde_json::Value>,
}

/// What the router needs to know about one subgraph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubgraphConfiguration {
    pub name: String,
    pub url: String,
    pub configuration_data_map: ConfigurationDataMap,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_fields_are_omitted() {
        let mut data = ConfigurationData::new("Query");
        data.is_root_node = true;
        data.field_names.insert("products".to_owned());

        insta::assert_snapshot!(
            serde_json::to_string(&data).unwrap(),
            @r#"{"typeName":"Query","isRootNode":true,"fieldNames":["products"]}"#
        );
    }

    #[test]
    fn event_serialization() {
        let event = EventConfiguration {
            field_name: "productUpdated".to_owned(),
            topic: "products.updated".to_owned(),
            kind: EventKind::Subscribe,
            source_id: Some("nats".to_owned()),
            provider_type: None,
            topics: vec!["products.updated".to_owned()],
            stream_configuration: None,
        };

        insta::assert_snapshot!(
            serde_json::to_string(&event).unwrap(),
            @r#"{"fieldName":"productUpdated","topic":"products.updated","type":"subscribe","sourceId":"nats","topics":["products.updated"]}"#
        );
    }

    #[test]
    fn subscription_filter_serialization() {
        let condition = SubscriptionFilterCondition::Or(vec![
            SubscriptionFilterCondition::In(SubscriptionFieldCondition {
                field_path: vec!["id".to_owned()],
                values: vec![1.into(), 2.into()],
            }),
            SubscriptionFilterCondition::Not(Box::new(SubscriptionFilterCondition::In(SubscriptionFieldCondition {
                field_path: vec!["owner".to_owned(), "name".to_owned()],
                values: vec![serde_json::Value::Null],
            }))),
        ]);

        insta::assert_snapshot!(
            serde_json::to_string(&condition).unwrap(),
            @r#"{"or":[{"in":{"fieldPath":["id"],"values":[1,2]}},{"not":{"in":{"fieldPath":["owner","name"],"values":[null]}}}]}"#
        );
    }
}

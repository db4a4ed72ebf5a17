//! Event-driven fields: the provider-agnostic `@events*` directives, the Kafka, NATS and Redis
//! `@edfs__*` directives, and the structure of `@openfed__subscriptionFilter` conditions.

use super::definitions::ast_value_to_value;
use crate::{
    ast::Value,
    configuration::{
        EventConfiguration, EventKind, EventProvider, NatsStreamConfiguration, SubscriptionFieldCondition,
        SubscriptionFilterCondition,
    },
};
use cynic_parser::type_system as ast;
use itertools::Itertools;
use std::collections::BTreeSet;

pub(crate) const SUBSCRIPTION_FILTER: &str = "openfed__subscriptionFilter";

const DEFAULT_PROVIDER_ID: &str = "default";
const DEFAULT_CONSUMER_INACTIVE_THRESHOLD: i64 = 30;
const MAX_SUBSCRIPTION_FILTER_DEPTH: usize = 5;
const MAX_CONDITION_LIST_LENGTH: usize = 5;

const INVALID_STREAM_CONFIGURATION: &str = r#"The "streamConfiguration" argument must be a valid input object with the following form:
  input edfs__NatsStreamConfiguration {
    consumerInactiveThreshold: Int! = 30
    consumerName: String!
    streamName: String!
  }"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum EventDirective {
    /// `@eventsPublish`, `@eventsRequest` and `@eventsSubscribe`, with a `topic` and an optional
    /// `sourceID`.
    Generic(EventKind),
    KafkaPublish,
    KafkaSubscribe,
    NatsPublish,
    NatsRequest,
    NatsSubscribe,
    RedisPublish,
    RedisSubscribe,
}

impl EventDirective {
    pub(super) fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "eventsPublish" => EventDirective::Generic(EventKind::Publish),
            "eventsRequest" => EventDirective::Generic(EventKind::Request),
            "eventsSubscribe" => EventDirective::Generic(EventKind::Subscribe),
            "edfs__kafkaPublish" => EventDirective::KafkaPublish,
            "edfs__kafkaSubscribe" => EventDirective::KafkaSubscribe,
            "edfs__natsPublish" => EventDirective::NatsPublish,
            "edfs__natsRequest" => EventDirective::NatsRequest,
            "edfs__natsSubscribe" => EventDirective::NatsSubscribe,
            "edfs__redisPublish" => EventDirective::RedisPublish,
            "edfs__redisSubscribe" => EventDirective::RedisSubscribe,
            _ => return None,
        })
    }

    fn kind(self) -> EventKind {
        match self {
            EventDirective::Generic(kind) => kind,
            EventDirective::KafkaPublish | EventDirective::NatsPublish | EventDirective::RedisPublish => {
                EventKind::Publish
            }
            EventDirective::NatsRequest => EventKind::Request,
            EventDirective::KafkaSubscribe | EventDirective::NatsSubscribe | EventDirective::RedisSubscribe => {
                EventKind::Subscribe
            }
        }
    }

    fn provider(self) -> Option<EventProvider> {
        match self {
            EventDirective::Generic(_) => None,
            EventDirective::KafkaPublish | EventDirective::KafkaSubscribe => Some(EventProvider::Kafka),
            EventDirective::NatsPublish | EventDirective::NatsRequest | EventDirective::NatsSubscribe => {
                Some(EventProvider::Nats)
            }
            EventDirective::RedisPublish | EventDirective::RedisSubscribe => Some(EventProvider::Redis),
        }
    }

    /// The argument naming what the event is bound to, and whether it takes a list.
    fn subject_argument(self) -> (&'static str, bool) {
        match self {
            EventDirective::Generic(_) | EventDirective::KafkaPublish => ("topic", false),
            EventDirective::KafkaSubscribe => ("topics", true),
            EventDirective::NatsPublish | EventDirective::NatsRequest => ("subject", false),
            EventDirective::NatsSubscribe => ("subjects", true),
            EventDirective::RedisPublish => ("channel", false),
            EventDirective::RedisSubscribe => ("channels", true),
        }
    }

    fn provider_argument(self) -> &'static str {
        match self {
            EventDirective::Generic(_) => "sourceID",
            _ => "providerId",
        }
    }
}

/// Read an event directive on `type_name.field_name`. On failure, returns every reason the
/// directive is invalid. Adjusted values are reported in `warnings`.
pub(super) fn ingest_event(
    directive: ast::Directive<'_>,
    event: EventDirective,
    type_name: &str,
    field_name: &str,
    argument_names: &[&str],
    warnings: &mut Vec<String>,
) -> Result<EventConfiguration, Vec<String>> {
    let mut errors = Vec::new();

    if let Some(expected) = misplaced(event.kind(), type_name) {
        errors.push(format!(
            "{} event directives can only be defined on {expected} fields.",
            match event.kind() {
                EventKind::Publish => "Publish",
                EventKind::Request => "Request",
                EventKind::Subscribe => "Subscribe",
            }
        ));
    }

    let (subject_argument, takes_list) = event.subject_argument();
    let provider_argument = event.provider_argument();
    let mut topics = Vec::new();
    let mut provider_id = None;
    let mut stream_configuration = None;

    for argument in directive.arguments() {
        let name = argument.name();
        let value = ast_value_to_value(argument.value());

        if name == subject_argument && !takes_list {
            match value {
                Value::String(subject) if !subject.is_empty() => {
                    check_argument_templates(&subject, argument_names, &mut errors);
                    topics.push(subject);
                }
                _ => errors.push(format!(
                    r#"The "{name}" argument must be string with a minimum length of one."#
                )),
            }
        } else if name == subject_argument {
            let Value::List(items) = value else {
                errors.push(format!(r#"The "{name}" argument must be a list of strings."#));
                continue;
            };

            for item in items {
                match item {
                    Value::String(subject) if !subject.is_empty() => {
                        check_argument_templates(&subject, argument_names, &mut errors);
                        topics.push(subject);
                    }
                    _ => {
                        errors.push(format!(
                            r#"Each item in the "{name}" argument list must be a string with a minimum length of one. However, at least one value provided in the list was invalid."#
                        ));
                        break;
                    }
                }
            }
        } else if name == provider_argument {
            match value {
                Value::String(id) if !id.is_empty() => provider_id = Some(id),
                _ => errors.push(format!(
                    r#"If explicitly defined, the "{name}" argument must be a string with a minimum length of one."#
                )),
            }
        } else if name == "streamConfiguration" && event == EventDirective::NatsSubscribe {
            stream_configuration = nats_stream_configuration(&value, &mut errors);
        } else {
            errors.push(format!(r#"The argument "{name}" is not defined on "@{}"."#, directive.name()));
        }
    }

    let subject_is_defined = directive.argument(subject_argument).is_some();

    if !subject_is_defined {
        errors.push(format!(r#"The "{subject_argument}" argument is required."#));
    } else if topics.is_empty() && takes_list {
        errors.push(format!(
            r#"The "{subject_argument}" argument must be a list of at least one string."#
        ));
    }

    let topic = match topics.first() {
        Some(topic) if errors.is_empty() => topic.clone(),
        _ => return Err(errors),
    };

    if let Some(stream_configuration) = &mut stream_configuration {
        clamp_consumer_inactive_threshold(stream_configuration, type_name, field_name, warnings);
    }

    let provider_type = event.provider();

    if provider_type.is_some() {
        provider_id.get_or_insert_with(|| DEFAULT_PROVIDER_ID.to_owned());
    }

    Ok(EventConfiguration {
        field_name: field_name.to_owned(),
        topic,
        kind: event.kind(),
        source_id: provider_id,
        provider_type,
        topics,
        stream_configuration,
    })
}

/// The root type an event of this kind belongs on, when `type_name` is not one of them.
fn misplaced(kind: EventKind, type_name: &str) -> Option<&'static str> {
    let expected = match kind {
        EventKind::Publish => "Mutation",
        EventKind::Request => "Query or Mutation",
        EventKind::Subscribe => "Subscription",
    };

    let allowed = match kind {
        EventKind::Request => type_name == "Query" || type_name == "Mutation",
        EventKind::Publish | EventKind::Subscribe => type_name == expected,
    };

    (!allowed).then_some(expected)
}

/// Subjects may interpolate field arguments as `{{ args.name }}`.
fn check_argument_templates(subject: &str, argument_names: &[&str], errors: &mut Vec<String>) {
    let mut rest = subject;

    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else { break };

        let referenced = after[..end]
            .trim()
            .strip_prefix("args.")
            .filter(|name| !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));

        if let Some(name) = referenced {
            let error = format!(r#"An argument template references the undefined argument "{name}"."#);

            if !argument_names.contains(&name) && !errors.contains(&error) {
                errors.push(error);
            }
        }

        rest = &after[end + 2..];
    }
}

fn nats_stream_configuration(value: &Value, errors: &mut Vec<String>) -> Option<NatsStreamConfiguration> {
    let fields = match value {
        Value::Object(fields) if !fields.is_empty() => fields,
        _ => {
            errors.push(INVALID_STREAM_CONFIGURATION.to_owned());
            return None;
        }
    };

    let mut seen = BTreeSet::new();
    let mut problems = Vec::new();
    let mut consumer_name = None;
    let mut stream_name = None;
    let mut consumer_inactive_threshold = DEFAULT_CONSUMER_INACTIVE_THRESHOLD;

    for (name, value) in fields {
        if !seen.insert(name.as_str()) {
            problems.push(format!(r#"The field "{name}" is defined more than once."#));
            continue;
        }

        match (name.as_str(), value) {
            ("consumerName", Value::String(value)) if !value.is_empty() => consumer_name = Some(value.clone()),
            ("streamName", Value::String(value)) if !value.is_empty() => stream_name = Some(value.clone()),
            ("consumerInactiveThreshold", Value::Int(value)) => consumer_inactive_threshold = *value,
            ("consumerName" | "streamName", _) => problems.push(format!(
                r#"The required field "{name}" must be a string with a minimum length of one."#
            )),
            ("consumerInactiveThreshold", value) => problems.push(format!(
                r#"The value "{value}" of "consumerInactiveThreshold" is not a valid "Int"."#
            )),
            (name, _) => problems.push(format!(r#"The field "{name}" is not defined."#)),
        }
    }

    for required in ["consumerName", "streamName"] {
        if !seen.contains(required) {
            problems.push(format!(r#"The required field "{required}" is not defined."#));
        }
    }

    match (consumer_name, stream_name) {
        (Some(consumer_name), Some(stream_name)) if problems.is_empty() => Some(NatsStreamConfiguration {
            consumer_inactive_threshold,
            consumer_name,
            stream_name,
        }),
        _ => {
            errors.push(format!("{INVALID_STREAM_CONFIGURATION}\n {}", problems.join("\n ")));
            None
        }
    }
}

fn clamp_consumer_inactive_threshold(
    stream_configuration: &mut NatsStreamConfiguration,
    type_name: &str,
    field_name: &str,
    warnings: &mut Vec<String>,
) {
    let threshold = &mut stream_configuration.consumer_inactive_threshold;

    let adjustment = if *threshold < 0 {
        *threshold = DEFAULT_CONSUMER_INACTIVE_THRESHOLD;
        format!("The value has been set to {DEFAULT_CONSUMER_INACTIVE_THRESHOLD}.")
    } else if *threshold > i64::from(i32::MAX) {
        *threshold = 0;
        "The value has been set to 0. This means the consumer will remain indefinitely active until its manual deletion.".to_owned()
    } else {
        return;
    };

    warnings.push(format!(
        r#"The "consumerInactiveThreshold" of the NATS stream configuration on "{type_name}.{field_name}" must be a positive 32-bit integer. {adjustment}"#
    ));
}

/// Read the `condition` argument of `@openfed__subscriptionFilter`. Field paths are only split
/// here: they are checked against the supergraph once it is merged.
pub(super) fn ingest_subscription_filter(directive: ast::Directive<'_>) -> Result<SubscriptionFilterCondition, Vec<String>> {
    let Some(condition) = directive.argument("condition") else {
        return Err(vec![r#" The "condition" argument is required."#.to_owned()]);
    };

    let mut errors = Vec::new();
    let condition = filter_condition(&ast_value_to_value(condition.value()), "condition", 1, &mut errors);

    match condition {
        Some(condition) if errors.is_empty() => Ok(condition),
        _ => Err(errors),
    }
}

fn filter_condition(
    value: &Value,
    input_path: &str,
    depth: usize,
    errors: &mut Vec<String>,
) -> Option<SubscriptionFilterCondition> {
    if depth > MAX_SUBSCRIPTION_FILTER_DEPTH {
        errors.push(format!(
            r#" The input path "{input_path}" exceeds the maximum depth of {MAX_SUBSCRIPTION_FILTER_DEPTH} for any one filter condition."#
        ));
        return None;
    }

    let Value::Object(fields) = value else {
        errors.push(format!(
            r#" Expected the input path "{input_path}" to be type "object" but received "{}"."#,
            value_kind(value)
        ));
        return None;
    };

    let [(name, value)] = fields.as_slice() else {
        errors.push(format!(
            r#" Each "openfed__SubscriptionFilterCondition" input object must define exactly one of the following input value fields: "AND", "IN", "NOT", or "OR". However, input path "{input_path}" defines {} fields."#,
            fields.len()
        ));
        return None;
    };

    let parent_path = input_path;
    let input_path = format!("{parent_path}.{name}");

    match (name.as_str(), value) {
        ("AND" | "OR", Value::List(items)) => {
            if !(1..=MAX_CONDITION_LIST_LENGTH).contains(&items.len()) {
                errors.push(format!(
                    r#" An AND or OR input field defined on a "openfed__SubscriptionFilterCondition" should define a list of 1–5 nested conditions. However, the list defined on input path "{input_path}" has a length of {}."#,
                    items.len()
                ));
                return None;
            }

            let conditions = items
                .iter()
                .enumerate()
                .map(|(idx, item)| filter_condition(item, &format!("{input_path}[{idx}]"), depth + 1, errors))
                .collect::<Vec<_>>()
                .into_iter()
                .collect::<Option<Vec<_>>>()?;

            Some(if name == "AND" {
                SubscriptionFilterCondition::And(conditions)
            } else {
                SubscriptionFilterCondition::Or(conditions)
            })
        }
        ("NOT", Value::Object(_)) => filter_condition(value, &input_path, depth + 1, errors)
            .map(|condition| SubscriptionFilterCondition::Not(Box::new(condition))),
        ("IN", Value::Object(fields)) => field_condition(fields, &input_path, errors).map(SubscriptionFilterCondition::In),
        ("AND" | "OR" | "NOT" | "IN", value) => {
            let expected = if matches!(name.as_str(), "AND" | "OR") { "list" } else { "object" };

            errors.push(format!(
                r#" Expected the value of input path "{input_path}" to be type "{expected}" but received type "{}""#,
                value_kind(value)
            ));
            None
        }
        (name, _) => {
            errors.push(format!(
                r#" Each "openfed__SubscriptionFilterCondition" input object must define exactly one of the following input value fields: "AND", "IN", "NOT", or "OR". However, input path "{parent_path}" defines the invalid input value field "{name}"."#
            ));
            None
        }
    }
}

fn field_condition(
    fields: &[(String, Value)],
    input_path: &str,
    errors: &mut Vec<String>,
) -> Option<SubscriptionFieldCondition> {
    let mut seen = BTreeSet::new();
    let mut problems = Vec::new();
    let mut field_path = None;
    let mut values = None;

    for (name, value) in fields {
        let value_path = format!("{input_path}.{name}");

        match name.as_str() {
            "fieldPath" | "values" if !seen.insert(name.as_str()) => {
                problems.push(format!(r#" The field "{name}" is defined more than once."#));
            }
            "fieldPath" => match value {
                Value::String(path) if !path.is_empty() && path.split('.').all(|segment| !segment.is_empty()) => {
                    field_path = Some(path.split('.').map(str::to_owned).collect());
                }
                Value::String(path) => problems.push(format!(
                    r#" Input path "{value_path}" defines the value "{path}", which is not a period (.) delimited field path."#
                )),
                other => problems.push(format!(
                    r#" Expected the input path "{value_path}" to be type "string" but received "{}"."#,
                    value_kind(other)
                )),
            },
            "values" => values = filter_values(value, &value_path, &mut problems),
            other => problems.push(format!(r#" The field "{other}" is not defined."#)),
        }
    }

    for required in ["fieldPath", "values"] {
        if !seen.contains(required) {
            problems.push(format!(r#" The required field "{required}" is not defined."#));
        }
    }

    match (field_path, values) {
        (Some(field_path), Some(values)) if problems.is_empty() => Some(SubscriptionFieldCondition { field_path, values }),
        _ => {
            errors.push(format!(
                r#" Each "openfed__SubscriptionFieldCondition" input object must only define the following two input value fields: "fieldPath" and "values".
 However, input path "{input_path}" is invalid because:
{}"#,
                problems.iter().map(|problem| format!(" {problem}")).join("\n")
            ));
            None
        }
    }
}

/// Scalars are coerced to a list of one. Duplicates are dropped.
fn filter_values(value: &Value, input_path: &str, problems: &mut Vec<String>) -> Option<Vec<serde_json::Value>> {
    let items = match value {
        Value::Null | Value::Object(_) => {
            problems.push(format!(
                r#" Expected the input path "{input_path}" to be type "list" but received "{}"."#,
                value_kind(value)
            ));
            return None;
        }
        Value::List(items) => items.as_slice(),
        scalar => std::slice::from_ref(scalar),
    };

    let mut values = Vec::new();
    let mut invalid_indices = Vec::new();

    for (idx, item) in items.iter().enumerate() {
        match filter_value(item) {
            Some(value) if !values.contains(&value) => values.push(value),
            Some(_) => (),
            None => invalid_indices.push(idx),
        }
    }

    let invalid = if !invalid_indices.is_empty() {
        format!(
            r#"However, the following {} defined on input path "{input_path}" {} not a valid "openfed__SubscriptionFilterValue": {}"#,
            if invalid_indices.len() > 1 { "indices" } else { "index" },
            if invalid_indices.len() > 1 { "are" } else { "is" },
            invalid_indices.iter().join(", ")
        )
    } else if values.is_empty() {
        format!(r#"However, the list defined on input path "{input_path}" is empty."#)
    } else {
        return Some(values);
    };

    problems.push(format!(
        r#" A "openfed__SubscriptionFieldCondition" input object must define a "values" input value field with a list of at least one valid "openfed__SubscriptionFilterValue" kind (boolean, enum, float, int, null, or string).
 {invalid}"#
    ));

    None
}

fn filter_value(value: &Value) -> Option<serde_json::Value> {
    Some(match value {
        Value::Null => serde_json::Value::Null,
        Value::Boolean(value) => (*value).into(),
        Value::Int(value) => (*value).into(),
        Value::Float(value) => serde_json::Number::from_f64(*value)?.into(),
        Value::String(value) | Value::Enum(value) => value.clone().into(),
        Value::List(_) | Value::Object(_) => return None,
    })
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Int(_) => "int",
        Value::Float(_) => "float",
        Value::String(_) => "string",
        Value::Boolean(_) => "boolean",
        Value::Enum(_) => "enum",
        Value::List(_) => "list",
        Value::Object(_) => "object",
    }
}

use super::*;
use crate::configuration::SubscriptionFilterCondition;

/// Check the field paths of every `@openfed__subscriptionFilter` against the merged schema. A
/// path must resolve to a leaf, through fields the subgraph declaring the filter defines and
/// that are not `@inaccessible`.
pub(super) fn validate_subscription_filters(ctx: &mut Context<'_>) {
    let subgraphs = ctx.subgraphs;

    for (subgraph_idx, subgraph) in subgraphs.iter().enumerate() {
        let Some(subscription) = subgraph.type_federation("Subscription") else {
            continue;
        };

        for (field_name, federation) in &subscription.fields {
            let Some(condition) = &federation.subscription_filter else {
                continue;
            };

            let coordinate = ("Subscription".to_owned(), field_name.clone());

            if ctx.subscription_filters.contains_key(&coordinate) {
                continue;
            }

            let subgraph_name = ctx.subgraph_name(subgraph_idx);
            let errors = condition_errors(ctx, subgraph_name, field_name, condition);

            if errors.is_empty() {
                ctx.subscription_filters.insert(coordinate, condition.clone());
            } else {
                ctx.push_error(format!(
                    "The \"@openfed__subscriptionFilter\" directive defined on path \"Subscription.{field_name}\" is invalid for the following reason(s):\n{}",
                    errors.join("\n")
                ));
            }
        }
    }
}

fn condition_errors(
    ctx: &Context<'_>,
    subgraph_name: &str,
    field_name: &str,
    condition: &SubscriptionFilterCondition,
) -> Vec<String> {
    let Some(field) = ctx.schema.field("Subscription", field_name) else {
        return Vec::new();
    };

    let root_type_name = field.ty.name.as_str();

    if !ctx
        .schema
        .get(root_type_name)
        .is_some_and(|definition| definition.kind == TypeKind::Object)
    {
        return vec![format!(
            r#" The field "Subscription.{field_name}" returns "{root_type_name}", which is not an object type; therefore, its events cannot be filtered."#
        )];
    }

    let mut errors = Vec::new();
    let mut paths = Vec::new();
    field_condition_paths(condition, "condition".to_owned(), &mut paths);

    for (input_path, field_path) in paths {
        if let Err(error) = check_field_path(ctx, subgraph_name, root_type_name, field_path) {
            errors.push(format!(
                " Input path \"{input_path}.IN.fieldPath\" defines the value \"{}\".\n However, {error}",
                field_path.join(".")
            ));
        }
    }

    errors
}

/// The input path of each `IN` condition with its field path.
fn field_condition_paths<'a>(
    condition: &'a SubscriptionFilterCondition,
    input_path: String,
    out: &mut Vec<(String, &'a [String])>,
) {
    match condition {
        SubscriptionFilterCondition::In(condition) => out.push((input_path, &condition.field_path)),
        SubscriptionFilterCondition::Not(condition) => field_condition_paths(condition, format!("{input_path}.NOT"), out),
        SubscriptionFilterCondition::And(conditions) | SubscriptionFilterCondition::Or(conditions) => {
            let operator = if matches!(condition, SubscriptionFilterCondition::And(_)) {
                "AND"
            } else {
                "OR"
            };

            for (idx, condition) in conditions.iter().enumerate() {
                field_condition_paths(condition, format!("{input_path}.{operator}[{idx}]"), out);
            }
        }
    }
}

fn check_field_path(ctx: &Context<'_>, subgraph_name: &str, root_type_name: &str, field_path: &[String]) -> Result<(), String> {
    let mut parent_type_name = root_type_name;

    for (idx, field_name) in field_path.iter().enumerate() {
        let partial_path = field_path[..=idx].join(".");

        let Some(parent) = ctx
            .schema
            .get(parent_type_name)
            .filter(|definition| definition.kind == TypeKind::Object)
        else {
            return Err(format!(
                r#"the path "{partial_path}" is invalid because "{parent_type_name}" is not an object type."#
            ));
        };

        let Some(field) = parent.fields.get(field_name) else {
            return Err(format!(
                r#"the path "{partial_path}" is invalid because no field named "{field_name}" exists on type "{parent_type_name}"."#
            ));
        };

        let defined_in_subgraph = ctx
            .origins
            .get(&(parent_type_name.to_owned(), field_name.clone()))
            .is_some_and(|origins| origins.contains(subgraph_name));

        if !defined_in_subgraph {
            return Err(format!(
                r#"the path "{partial_path}" is invalid because the field "{parent_type_name}.{field_name}" is not defined in subgraph "{subgraph_name}"."#
            ));
        }

        if field.directives.inaccessible {
            return Err(format!(
                r#"the path "{partial_path}" is invalid because the field "{parent_type_name}.{field_name}" is declared "@inaccessible"."#
            ));
        }

        parent_type_name = field.ty.name.as_str();
    }

    match ctx.schema.get(parent_type_name) {
        Some(definition) if ctx.schema.is_composite(parent_type_name) => Err(format!(
            r#"the final field "{}" is {} "{parent_type_name}", which is not a leaf type; therefore, it requires further selections."#,
            field_path.last().map(String::as_str).unwrap_or_default(),
            definition.kind
        )),
        _ => Ok(()),
    }
}

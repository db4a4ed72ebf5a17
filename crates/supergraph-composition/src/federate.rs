//! Merge normalized subgraphs into one supergraph schema and configuration map.

mod configuration;
mod context;
mod enums;
mod fields;
mod inputs;
mod interface_objects;
mod objects;
mod subscription_filters;

use self::context::Context;
use crate::{
    ast::{Schema, TypeDefinition, TypeKind},
    configuration::{ConfigurationDataMap, SubscriptionFilterCondition},
    normalize::NormalizedSubgraph,
    Diagnostics,
};
use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet};

/// A `(type name, field name)` pair.
pub(crate) type FieldCoordinate = (String, String);

/// The result of merging. The schema is sorted.
#[derive(Debug)]
pub(crate) struct Federated {
    pub(crate) schema: Schema,
    pub(crate) configuration: ConfigurationDataMap,
    /// Per subgraph, in the same order as the input to [federate].
    pub(crate) subgraph_configurations: Vec<ConfigurationDataMap>,
    /// For each field of the supergraph, the subgraphs that can resolve it.
    pub(crate) origins: BTreeMap<FieldCoordinate, BTreeSet<String>>,
    /// Valid `@openfed__subscriptionFilter` conditions per subscription field.
    pub(crate) subscription_filters: BTreeMap<FieldCoordinate, SubscriptionFilterCondition>,
}

impl Federated {
    pub(crate) fn origin_set(&self, type_name: &str, field_name: &str) -> Option<&BTreeSet<String>> {
        self.origins.get(&(type_name.to_owned(), field_name.to_owned()))
    }
}

/// `subgraphs` must be sorted by name: merge order decides which description or deprecation
/// reason wins.
#[tracing::instrument(skip_all, fields(subgraphs = subgraphs.len()))]
pub(crate) fn federate(subgraphs: &[NormalizedSubgraph], diagnostics: &mut Diagnostics) -> Federated {
    let mut ctx = Context::new(subgraphs, diagnostics);

    let mut definitions: BTreeMap<&str, Vec<(usize, &TypeDefinition)>> = BTreeMap::new();

    for (subgraph_idx, subgraph) in subgraphs.iter().enumerate() {
        for definition in subgraph.schema.types.values() {
            definitions
                .entry(definition.name.as_str())
                .or_default()
                .push((subgraph_idx, definition));
        }
    }

    for (type_name, definitions) in &definitions {
        let Some(kind) = merged_kind(&mut ctx, type_name, definitions) else {
            continue;
        };

        match kind {
            TypeKind::Object => objects::merge_object(&mut ctx, type_name, definitions),
            TypeKind::Interface => objects::merge_interface(&mut ctx, type_name, definitions),
            TypeKind::Union => merge_union(&mut ctx, type_name, definitions),
            TypeKind::Enum => enums::merge_enum(&mut ctx, type_name, definitions),
            TypeKind::Scalar => merge_scalar(&mut ctx, type_name, definitions),
            TypeKind::InputObject => inputs::merge_input_object(&mut ctx, type_name, definitions),
        }
    }

    interface_objects::merge_interface_objects(&mut ctx);
    objects::validate_interface_implementations(&mut ctx);
    validate_query_root(&mut ctx);
    subscription_filters::validate_subscription_filters(&mut ctx);

    let federated = ctx.finish();

    tracing::debug!(
        types = federated.schema.types.len(),
        fields = federated.origins.len(),
        "federated subgraphs"
    );

    federated
}

/// The kind a type has in the supergraph. Interface objects are objects in their subgraph but
/// stand for an interface. Reports an error and returns `None` when subgraphs disagree.
fn merged_kind(ctx: &mut Context<'_>, type_name: &str, definitions: &[(usize, &TypeDefinition)]) -> Option<TypeKind> {
    let kind_in = |(subgraph_idx, definition): &(usize, &TypeDefinition)| {
        if ctx.subgraphs[*subgraph_idx].is_interface_object(type_name) {
            TypeKind::Interface
        } else {
            definition.kind
        }
    };

    let kinds: BTreeMap<TypeKind, Vec<&str>> = definitions
        .iter()
        .map(|definition| (kind_in(definition), ctx.subgraphs[definition.0].name.as_str()))
        .into_group_map()
        .into_iter()
        .collect();

    if kinds.len() == 1 {
        return kinds.into_keys().next();
    }

    let kinds = kinds
        .iter()
        .map(|(kind, subgraphs)| {
            format!(
                "{kind} in {}",
                subgraphs.iter().map(|name| format!(r#""{name}""#)).join(", ")
            )
        })
        .join("; ");

    ctx.push_error(format!(
        r#"The type "{type_name}" is defined with different kinds across subgraphs: {kinds}."#
    ));

    None
}

fn merge_union(ctx: &mut Context<'_>, type_name: &str, definitions: &[(usize, &TypeDefinition)]) {
    let mut merged = TypeDefinition::new(type_name, TypeKind::Union);

    for (_, definition) in definitions {
        merge_type_metadata(&mut merged, definition);
        merged.members.extend(definition.members.iter().cloned());
    }

    ctx.insert_type(merged);
}

fn merge_scalar(ctx: &mut Context<'_>, type_name: &str, definitions: &[(usize, &TypeDefinition)]) {
    let mut merged = TypeDefinition::new(type_name, TypeKind::Scalar);

    for (_, definition) in definitions {
        merge_type_metadata(&mut merged, definition);
    }

    ctx.insert_type(merged);
}

/// Description (first wins) and persisted directives.
fn merge_type_metadata(merged: &mut TypeDefinition, definition: &TypeDefinition) {
    if merged.description.is_none() {
        merged.description.clone_from(&definition.description);
    }

    merged.directives.merge(&definition.directives);
}

fn validate_query_root(ctx: &mut Context<'_>) {
    let has_query_fields = ctx
        .schema
        .get("Query")
        .is_some_and(|query| query.kind == TypeKind::Object && !query.fields.is_empty());

    if !has_query_fields {
        ctx.push_error("The supergraph has no query root type: at least one subgraph must define a field on Query.".to_owned());
    }
}

#[cfg(test)]
mod tests;

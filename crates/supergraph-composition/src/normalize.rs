//! Per-subgraph normalization: parse the SDL, validate federation directives locally, and strip
//! them into typed metadata and a [`ConfigurationDataMap`]. Later passes never look at directive
//! syntax again.
//!
//! This is a separate module because we want to keep GraphQL parser types out of the rest of the
//! crate.

mod configuration;
mod definitions;
mod directives;
mod events;
mod roots;
mod validate;

use crate::{
    ast::{Schema, TypeKind},
    configuration::{ConfigurationDataMap, EventConfiguration, SubscriptionFilterCondition},
    field_set::FieldSet,
    Diagnostics, InputError, Subgraph,
};
use cynic_parser::type_system as ast;
use std::collections::BTreeMap;

pub(crate) const ROOT_TYPE_NAMES: [&str; 3] = ["Query", "Mutation", "Subscription"];

/// A subgraph after normalization: a plain schema, plus the federation metadata extracted from
/// its directives.
#[derive(Debug)]
pub(crate) struct NormalizedSubgraph {
    pub(crate) name: String,
    pub(crate) url: String,
    pub(crate) schema: Schema,
    pub(crate) federation: BTreeMap<String, TypeFederation>,
    pub(crate) configuration: ConfigurationDataMap,
    /// In federation v1 subgraphs, every object field is implicitly shareable.
    pub(crate) is_version_two: bool,
    pub(crate) warnings: Diagnostics,
}

#[derive(Debug, Default)]
pub(crate) struct TypeFederation {
    pub(crate) keys: Vec<Key>,
    pub(crate) shareable: bool,
    pub(crate) interface_object: bool,
    pub(crate) fields: BTreeMap<String, FieldFederation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Key {
    pub(crate) fields: FieldSet,
    pub(crate) resolvable: bool,
}

#[derive(Debug, Default)]
pub(crate) struct FieldFederation {
    pub(crate) external: bool,
    pub(crate) shareable: bool,
    pub(crate) provides: Option<FieldSet>,
    pub(crate) requires: Option<FieldSet>,
    pub(crate) override_from: Option<String>,
    pub(crate) events: Vec<EventConfiguration>,
    pub(crate) subscription_filter: Option<SubscriptionFilterCondition>,
}

impl NormalizedSubgraph {
    pub(crate) fn type_federation(&self, type_name: &str) -> Option<&TypeFederation> {
        self.federation.get(type_name)
    }

    pub(crate) fn field_federation(&self, type_name: &str, field_name: &str) -> Option<&FieldFederation> {
        self.federation.get(type_name)?.fields.get(field_name)
    }

    pub(crate) fn keys(&self, type_name: &str) -> &[Key] {
        self.federation
            .get(type_name)
            .map(|federation| federation.keys.as_slice())
            .unwrap_or_default()
    }

    pub(crate) fn is_entity(&self, type_name: &str) -> bool {
        !self.keys(type_name).is_empty()
    }

    pub(crate) fn is_interface_object(&self, type_name: &str) -> bool {
        self.federation
            .get(type_name)
            .is_some_and(|federation| federation.interface_object)
    }

    /// Is the field selected at the top level of any key of its parent type?
    pub(crate) fn is_key_field(&self, type_name: &str, field_name: &str) -> bool {
        self.keys(type_name)
            .iter()
            .any(|key| key.fields.field_names().any(|name| name == field_name))
    }

    pub(crate) fn is_external(&self, type_name: &str, field_name: &str) -> bool {
        self.field_federation(type_name, field_name)
            .is_some_and(|field| field.external)
    }

    pub(crate) fn is_shareable(&self, type_name: &str, field_name: &str) -> bool {
        !self.is_version_two
            || self.type_federation(type_name).is_some_and(|ty| ty.shareable)
            || self
                .field_federation(type_name, field_name)
                .is_some_and(|field| field.shareable)
            || self.is_key_field(type_name, field_name)
    }

    pub(crate) fn is_root_type(&self, type_name: &str) -> bool {
        ROOT_TYPE_NAMES.contains(&type_name)
            && self
                .schema
                .get(type_name)
                .is_some_and(|ty| ty.kind == TypeKind::Object)
    }

    pub(crate) fn root_types(&self) -> impl Iterator<Item = &str> + '_ {
        ROOT_TYPE_NAMES
            .into_iter()
            .filter(|name| self.is_root_type(name))
    }
}

#[derive(Debug)]
pub(crate) enum NormalizationError {
    /// The schema does not parse. Aborts the whole composition.
    Syntax(InputError),
    Invalid(Diagnostics),
}

struct Context<'a> {
    subgraph_name: &'a str,
    schema: Schema,
    federation: BTreeMap<String, TypeFederation>,
    roots: roots::RootTypes,
    /// Types that were defined with a plain (non-extension) definition.
    defined_types: std::collections::BTreeSet<String>,
    uses_version_two_directives: bool,
    links_federation_v2: bool,
    diagnostics: Diagnostics,
    warnings: Diagnostics,
}

impl Context<'_> {
    fn push_error(&mut self, message: impl std::fmt::Display) {
        self.diagnostics.push_fatal(
            crate::DiagnosticKind::Normalization,
            format!("[{}] {message}", self.subgraph_name),
        );
    }

    fn push_warning(&mut self, message: impl std::fmt::Display) {
        self.warnings.push_warning(format!("[{}] {message}", self.subgraph_name));
    }
}

#[tracing::instrument(skip_all, fields(subgraph = %subgraph.name))]
pub(crate) fn normalize(subgraph: &Subgraph) -> Result<NormalizedSubgraph, NormalizationError> {
    let empty_schema = || NormalizationError::Invalid(missing_configuration_map(&subgraph.name, "the schema is empty"));

    if only_ignored_tokens(&subgraph.schema) {
        return Err(empty_schema());
    }

    let document = cynic_parser::parse_type_system_document(&subgraph.schema).map_err(|err| {
        NormalizationError::Syntax(InputError::Syntax {
            subgraph: subgraph.name.clone(),
            message: err.to_string(),
        })
    })?;

    if document.definitions().next().is_none() {
        return Err(empty_schema());
    }

    let mut ctx = Context {
        subgraph_name: &subgraph.name,
        schema: Schema::default(),
        federation: BTreeMap::new(),
        roots: roots::RootTypes::default(),
        defined_types: Default::default(),
        uses_version_two_directives: false,
        links_federation_v2: false,
        diagnostics: Diagnostics::default(),
        warnings: Diagnostics::default(),
    };

    roots::ingest_schema_definitions(&mut ctx, &document);
    definitions::ingest_definitions(&mut ctx, &document);
    roots::drop_empty_root_types(&mut ctx);
    validate::validate_subgraph(&mut ctx);

    let is_version_two = ctx.links_federation_v2 || ctx.uses_version_two_directives;
    let configuration = configuration::build_configuration_map(&ctx);

    if configuration.is_empty() && !ctx.diagnostics.any_fatal() {
        return Err(NormalizationError::Invalid(missing_configuration_map(
            &subgraph.name,
            "the subgraph defines no object type with fields",
        )));
    }

    if ctx.diagnostics.any_fatal() {
        return Err(NormalizationError::Invalid(ctx.diagnostics));
    }

    tracing::debug!(
        types = ctx.schema.types.len(),
        configured_types = configuration.len(),
        is_version_two,
        "normalized subgraph"
    );

    Ok(NormalizedSubgraph {
        name: subgraph.name.clone(),
        url: subgraph.url.clone(),
        schema: ctx.schema,
        federation: ctx.federation,
        configuration,
        is_version_two,
        warnings: ctx.warnings,
    })
}

/// Whitespace, commas and comments carry no definitions.
fn only_ignored_tokens(schema: &str) -> bool {
    schema.lines().all(|line| {
        let line = line.trim_start_matches(|c: char| c.is_whitespace() || c == ',' || c == '\u{feff}');
        line.is_empty() || line.starts_with('#')
    })
}

fn missing_configuration_map(subgraph_name: &str, reason: &str) -> Diagnostics {
    let mut diagnostics = Diagnostics::default();
    diagnostics.push_fatal(
        crate::DiagnosticKind::Normalization,
        format!("[{subgraph_name}] Normalization failed to return a configuration map: {reason}."),
    );
    diagnostics
}

/// Federation machinery exposed by subgraphs. It is never composed.
fn is_federation_internal_type(name: &str) -> bool {
    matches!(
        name,
        "_Service"
            | "_Entity"
            | "_Any"
            | "_FieldSet"
            | "FieldSet"
            | "federation__FieldSet"
            | "federation__Scope"
            | "federation__Policy"
            | "link__Import"
            | "link__Purpose"
            | "openfed__FieldSet"
    )
}

#[cfg(test)]
mod tests;

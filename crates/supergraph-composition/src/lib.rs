//! Composition of federated GraphQL subgraphs into a supergraph.
//!
//! The pipeline, run by [compose()]:
//!
//! - Check the requested [RouterCompatibilityVersion] and the subgraph list.
//! - Normalize every subgraph: parse its SDL, validate its federation directives, and extract its
//!   [ConfigurationDataMap]. Subgraphs are normalized in parallel.
//! - Federate: merge the normalized subgraphs into one schema, recording which subgraphs can
//!   resolve each field.
//! - Check every reachable field can be resolved, unless disabled in [CompositionOptions].
//! - For a contract, built by [compose_contract()], hide the elements filtered out by its
//!   [ContractTags].
//! - Check the client schema, without the `@inaccessible` elements, is still valid.
//! - Emit the [FederatedGraph]: the schema rendered as SDL, and the router configuration.

#![cfg_attr(test, allow(unused_crate_dependencies))]

pub mod ast;
mod configuration;
mod contract;
mod diagnostics;
mod emit;
mod error;
mod federate;
mod field_set;
mod normalize;
mod options;
mod render_sdl;
mod resolvability;
mod result;
mod version;

pub use self::{
    configuration::{
        ArgumentConfigurationData, ConfigurationData, ConfigurationDataMap, EventConfiguration, EventKind,
        EventProvider, NatsStreamConfiguration, RequiredFieldConfiguration, SubgraphConfiguration,
        SubscriptionFieldCondition, SubscriptionFilterCondition,
    },
    contract::ContractTags,
    diagnostics::{Diagnostic, DiagnosticKind, Diagnostics},
    emit::FederatedGraph,
    error::InputError,
    options::CompositionOptions,
    render_sdl::render_sdl,
    result::CompositionResult,
    version::RouterCompatibilityVersion,
};

use self::normalize::{NormalizationError, NormalizedSubgraph};
use std::{collections::BTreeSet, num::NonZeroUsize};

/// A subgraph to compose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subgraph {
    /// Unique among the composed subgraphs, and non-empty.
    pub name: String,
    /// Where the router reaches the subgraph.
    pub url: String,
    /// The subgraph schema, as GraphQL SDL.
    pub schema: String,
}

impl Subgraph {
    pub fn new(name: impl Into<String>, url: impl Into<String>, schema: impl Into<String>) -> Self {
        Subgraph {
            name: name.into(),
            url: url.into(),
            schema: schema.into(),
        }
    }
}

/// Compose subgraphs into a [FederatedGraph].
///
/// The result is the same whatever the order of `subgraphs`.
#[tracing::instrument(skip_all, fields(subgraphs = subgraphs.len()))]
pub fn compose(subgraphs: &[Subgraph], options: &CompositionOptions) -> CompositionResult {
    compose_inner(subgraphs, options, None)
}

/// Compose subgraphs into a contract: a [FederatedGraph] where the elements filtered out by
/// `contract` are `@inaccessible`, and absent from the client schema.
///
/// Resolvability is checked on the full supergraph, before the contract is applied.
#[tracing::instrument(skip_all, fields(subgraphs = subgraphs.len()))]
pub fn compose_contract(
    subgraphs: &[Subgraph],
    options: &CompositionOptions,
    contract: &ContractTags,
) -> CompositionResult {
    compose_inner(subgraphs, options, Some(contract))
}

fn compose_inner(
    subgraphs: &[Subgraph],
    options: &CompositionOptions,
    contract: Option<&ContractTags>,
) -> CompositionResult {
    let version = match RouterCompatibilityVersion::resolve(options.router_compatibility_version.as_deref()) {
        Ok(version) => version,
        Err(error) => return error.into(),
    };

    if let Err(error) = validate_subgraph_names(subgraphs) {
        return error.into();
    }

    let (normalized, mut diagnostics) = match normalize_subgraphs(subgraphs) {
        Ok(normalized) => normalized,
        Err(error) => return error.into(),
    };

    if diagnostics.any_fatal() {
        if normalized.is_empty() {
            diagnostics.push_fatal(
                DiagnosticKind::Normalization,
                "No subgraph could be normalized. Composition cannot proceed.".to_owned(),
            );
        }

        return CompositionResult::failed(diagnostics);
    }

    let mut federated = federate::federate(&normalized, &mut diagnostics);

    if !diagnostics.any_fatal() && !options.disable_resolvability_validation {
        resolvability::validate(&federated, &normalized, &mut diagnostics);
    }

    if diagnostics.any_fatal() {
        tracing::debug!(errors = diagnostics.iter_errors().count(), "composition failed");
        return CompositionResult::failed(diagnostics);
    }

    if let Some(contract) = contract {
        contract::apply(&mut federated.schema, contract);
    }

    let client_schema = contract::client_schema(&federated.schema, &mut diagnostics);

    if diagnostics.any_fatal() {
        tracing::debug!(errors = diagnostics.iter_errors().count(), "client schema is invalid");
        return CompositionResult::failed(diagnostics);
    }

    let federated_graph = emit::emit(federated, &normalized, client_schema, version);

    tracing::debug!(warnings = diagnostics.len(), "composition succeeded");

    CompositionResult {
        federated_graph: Some(federated_graph),
        diagnostics,
    }
}

fn validate_subgraph_names(subgraphs: &[Subgraph]) -> Result<(), InputError> {
    if subgraphs.is_empty() {
        return Err(InputError::NoSubgraphs);
    }

    let mut seen = BTreeSet::new();

    for (position, subgraph) in subgraphs.iter().enumerate() {
        if subgraph.name.trim().is_empty() {
            return Err(InputError::EmptySubgraphName { position });
        }

        if !seen.insert(subgraph.name.as_str()) {
            return Err(InputError::DuplicateSubgraphName(subgraph.name.clone()));
        }
    }

    Ok(())
}

/// Normalize the subgraphs in parallel, on at most as many threads as the machine can run at once.
/// The successfully normalized subgraphs are returned sorted by name, with the warnings and errors
/// of all subgraphs. A syntax error in any subgraph aborts the run.
fn normalize_subgraphs(subgraphs: &[Subgraph]) -> Result<(Vec<NormalizedSubgraph>, Diagnostics), InputError> {
    let parallelism = std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1);

    let mut results: Vec<(&str, Result<NormalizedSubgraph, NormalizationError>)> =
        Vec::with_capacity(subgraphs.len());

    for chunk in subgraphs.chunks(parallelism) {
        std::thread::scope(|scope| {
            let handles: Vec<_> = chunk
                .iter()
                .map(|subgraph| (subgraph.name.as_str(), scope.spawn(move || normalize::normalize(subgraph))))
                .collect();

            for (name, handle) in handles {
                let result = handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic));
                results.push((name, result));
            }
        });
    }

    results.sort_by(|(a, _), (b, _)| a.cmp(b));

    let mut normalized = Vec::with_capacity(results.len());
    let mut diagnostics = Diagnostics::default();

    for (_, result) in results {
        match result {
            Ok(mut subgraph) => {
                diagnostics.extend(std::mem::take(&mut subgraph.warnings));
                normalized.push(subgraph);
            }
            Err(NormalizationError::Syntax(error)) => return Err(error),
            Err(NormalizationError::Invalid(errors)) => diagnostics.extend(errors),
        }
    }

    tracing::debug!(
        normalized = normalized.len(),
        diagnostics = diagnostics.len(),
        "normalized subgraphs"
    );

    Ok((normalized, diagnostics))
}

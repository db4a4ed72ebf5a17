//! Check that a query plan could exist for every field reachable from each root field.
//!
//! Every root field is walked on its own, as a graph of `(type, subgraph)` states. The walk starts
//! from the field's type in each subgraph that resolves the root field. A field resolved in a
//! subgraph leads to its type in that same subgraph, and an entity key the current state can
//! satisfy leads to the same type in another subgraph. Fields of reached types that no state of
//! the walk resolves are reported with the path that reached them.

use crate::{
    ast::TypeKind,
    federate::{FieldCoordinate, Federated},
    field_set::FieldSet,
    normalize::{NormalizedSubgraph, ROOT_TYPE_NAMES},
    DiagnosticKind, Diagnostics,
};
use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct State {
    type_name: String,
    subgraph_idx: usize,
    /// Selections a `@provides` on the field leading here makes available locally.
    provided: Option<FieldSet>,
}

struct Walker<'a> {
    federated: &'a Federated,
    subgraphs: &'a [NormalizedSubgraph],
    visited: BTreeSet<State>,
    /// States with the response path that reached them.
    queue: VecDeque<(State, String)>,
    resolved: BTreeSet<FieldCoordinate>,
    /// For each reached type, the subgraphs it was reached in.
    reached_in: BTreeMap<String, BTreeSet<usize>>,
    /// For each reached type, the shortest path that reached it.
    paths: BTreeMap<String, String>,
}

#[tracing::instrument(skip_all)]
pub(crate) fn validate(federated: &Federated, subgraphs: &[NormalizedSubgraph], diagnostics: &mut Diagnostics) {
    let mut states = 0;

    for root in ROOT_TYPE_NAMES {
        let Some(definition) = federated.schema.get(root) else {
            continue;
        };

        for field in definition.fields.values() {
            let mut walker = Walker::new(federated, subgraphs);
            let path = format!("{}.{}", root.to_lowercase(), field.name);

            for (subgraph_idx, subgraph) in subgraphs.iter().enumerate() {
                let Some(local) = subgraph.schema.field(root, &field.name) else {
                    continue;
                };

                if !walker.is_resolvable_in(root, &field.name, subgraph_idx)
                    || !subgraph.schema.is_composite(&local.ty.name)
                {
                    continue;
                }

                let provided = subgraph
                    .field_federation(root, &field.name)
                    .and_then(|federation| federation.provides.clone());

                walker.enqueue(&local.ty.name, subgraph_idx, provided, &path);
            }

            while let Some((state, path)) = walker.queue.pop_front() {
                walker.visit(&state, &path);
            }

            states += walker.visited.len();
            walker.report(&format!("{root}.{}", field.name), diagnostics);
        }
    }

    tracing::debug!(states, "walked the supergraph");
}

impl<'a> Walker<'a> {
    fn new(federated: &'a Federated, subgraphs: &'a [NormalizedSubgraph]) -> Self {
        Walker {
            federated,
            subgraphs,
            visited: BTreeSet::new(),
            queue: VecDeque::new(),
            resolved: BTreeSet::new(),
            reached_in: BTreeMap::new(),
            paths: BTreeMap::new(),
        }
    }

    fn enqueue(&mut self, type_name: &str, subgraph_idx: usize, provided: Option<FieldSet>, path: &str) {
        let state = State {
            type_name: type_name.to_owned(),
            subgraph_idx,
            provided,
        };

        if !self.visited.contains(&state) {
            self.visited.insert(state.clone());
            self.queue.push_back((state, path.to_owned()));
        }
    }

    fn visit(&mut self, state: &State, path: &str) {
        let subgraphs = self.subgraphs;
        let subgraph = &subgraphs[state.subgraph_idx];
        let type_name = state.type_name.as_str();

        let Some(definition) = subgraph.schema.get(type_name) else {
            return;
        };

        self.reached_in
            .entry(type_name.to_owned())
            .or_default()
            .insert(state.subgraph_idx);

        if !self.paths.contains_key(type_name) {
            self.paths.insert(type_name.to_owned(), path.to_owned());
        }

        // Abstract types resolve to their implementations in the same subgraph.
        if matches!(definition.kind, TypeKind::Interface | TypeKind::Union) {
            for possible_type in subgraph.schema.possible_types(type_name) {
                self.enqueue(&possible_type, state.subgraph_idx, state.provided.clone(), path);
            }
        }

        let concrete_types = self.interface_object_concrete_types(state);

        for field in definition.fields.values() {
            if !self.is_locally_resolvable(state, &field.name) {
                continue;
            }

            self.resolved.insert((type_name.to_owned(), field.name.clone()));

            for concrete_type in &concrete_types {
                self.resolved.insert((concrete_type.clone(), field.name.clone()));
            }

            if subgraph.schema.is_composite(&field.ty.name) {
                let provided = state
                    .provided
                    .as_ref()
                    .and_then(|provided| provided.subselection(type_name, &field.name))
                    .filter(|subselection| !subselection.is_empty())
                    .or_else(|| {
                        subgraph
                            .field_federation(type_name, &field.name)
                            .and_then(|federation| federation.provides.as_ref())
                    })
                    .cloned();

                self.enqueue(
                    &field.ty.name,
                    state.subgraph_idx,
                    provided,
                    &format!("{path}.{}", field.name),
                );
            }
        }

        self.entity_hops(state, &definition.interfaces, path);
    }

    /// When the state is an interface object, fields resolved here are resolved for every
    /// implementation of the interface.
    fn interface_object_concrete_types(&self, state: &State) -> BTreeSet<String> {
        let subgraph = &self.subgraphs[state.subgraph_idx];

        if !subgraph.is_interface_object(&state.type_name) {
            return BTreeSet::new();
        }

        self.federated
            .configuration
            .get(&state.type_name)
            .map(|data| data.entity_interface_concrete_type_names.clone())
            .unwrap_or_default()
    }

    fn is_resolvable_in(&self, type_name: &str, field_name: &str, subgraph_idx: usize) -> bool {
        self.federated
            .origin_set(type_name, field_name)
            .is_some_and(|origins| origins.contains(&self.subgraphs[subgraph_idx].name))
    }

    fn is_locally_resolvable(&self, state: &State, field_name: &str) -> bool {
        let subgraph = &self.subgraphs[state.subgraph_idx];

        self.is_resolvable_in(&state.type_name, field_name, state.subgraph_idx)
            || subgraph.is_key_field(&state.type_name, field_name)
            || state
                .provided
                .as_ref()
                .is_some_and(|provided| provided.subselection(&state.type_name, field_name).is_some())
    }

    fn can_satisfy(&self, state: &State, key: &FieldSet) -> bool {
        key.field_names()
            .all(|field_name| self.is_locally_resolvable(state, field_name))
    }

    /// Jump to the same entity in another subgraph, or from an implementation of an entity
    /// interface to the subgraphs using that interface as an interface object.
    fn entity_hops(&mut self, state: &State, interfaces: &BTreeSet<String>, path: &str) {
        let subgraphs = self.subgraphs;

        for (other_idx, other) in subgraphs.iter().enumerate() {
            if other_idx == state.subgraph_idx {
                continue;
            }

            let hop = other
                .keys(&state.type_name)
                .iter()
                .any(|key| key.resolvable && self.can_satisfy(state, &key.fields));

            if hop {
                self.enqueue(&state.type_name, other_idx, None, path);
            }

            for interface in interfaces {
                if !other.is_interface_object(interface) {
                    continue;
                }

                let hop = other
                    .keys(interface)
                    .iter()
                    .any(|key| key.resolvable && self.can_satisfy(state, &key.fields));

                if hop {
                    self.enqueue(interface, other_idx, None, path);
                }
            }
        }
    }

    fn report(&self, root_field: &str, diagnostics: &mut Diagnostics) {
        for (type_name, reached_in) in &self.reached_in {
            let Some(definition) = self.federated.schema.get(type_name) else {
                continue;
            };

            let path = self.paths.get(type_name).map(String::as_str).unwrap_or_default();

            for field_name in definition.fields.keys() {
                if self.resolved.contains(&(type_name.clone(), field_name.clone())) {
                    continue;
                }

                let resolved_in = self
                    .federated
                    .origin_set(type_name, field_name)
                    .map(|origins| origins.iter().map(|name| format!(r#""{name}""#)).join(", "))
                    .unwrap_or_default();

                let reached_in = reached_in
                    .iter()
                    .map(|idx| format!(r#""{}""#, self.subgraphs[*idx].name))
                    .join(", ");

                diagnostics.push_fatal(
                    DiagnosticKind::Resolvability,
                    format!(
                        r#"The field "{type_name}.{field_name}" is unresolvable at the path "{path}.{field_name}". It can be resolved in {resolved_in}, but from the root field "{root_field}" the type "{type_name}" can only be reached in {reached_in}, and no resolvable entity key leads from there to a subgraph that resolves it."#
                    ),
                );
            }
        }
    }
}

use super::*;
use crate::{configuration::SubscriptionFilterCondition, DiagnosticKind};

/// Context for [`federate`](super::federate).
pub(super) struct Context<'a> {
    pub(super) subgraphs: &'a [NormalizedSubgraph],
    diagnostics: &'a mut Diagnostics,
    /// The supergraph being built. Merge functions write to it, and read back what earlier merges
    /// produced only after all types have been merged.
    pub(super) schema: Schema,
    pub(super) origins: BTreeMap<FieldCoordinate, BTreeSet<String>>,
    /// `(subgraph the field was overridden from, type name, field name)`.
    pub(super) overrides: Vec<(usize, String, String)>,
    /// Concrete types behind each entity interface that some subgraph uses as an interface object.
    pub(super) entity_interface_concrete_types: BTreeMap<String, BTreeSet<String>>,
    pub(super) subscription_filters: BTreeMap<FieldCoordinate, SubscriptionFilterCondition>,
}

impl<'a> Context<'a> {
    pub(super) fn new(subgraphs: &'a [NormalizedSubgraph], diagnostics: &'a mut Diagnostics) -> Self {
        Context {
            subgraphs,
            diagnostics,
            schema: Schema::default(),
            origins: BTreeMap::new(),
            overrides: Vec::new(),
            entity_interface_concrete_types: BTreeMap::new(),
            subscription_filters: BTreeMap::new(),
        }
    }

    pub(super) fn push_error(&mut self, message: String) {
        self.diagnostics.push_fatal(DiagnosticKind::Merge, message);
    }

    pub(super) fn push_warning(&mut self, message: String) {
        self.diagnostics.push_warning(message);
    }

    pub(super) fn subgraph_name(&self, subgraph_idx: usize) -> &'a str {
        &self.subgraphs[subgraph_idx].name
    }

    pub(super) fn subgraph_idx_by_name(&self, name: &str) -> Option<usize> {
        self.subgraphs.iter().position(|subgraph| subgraph.name == name)
    }

    pub(super) fn insert_type(&mut self, mut definition: TypeDefinition) {
        definition.sort();
        self.schema.types.insert(definition.name.clone(), definition);
    }

    pub(super) fn add_origin(&mut self, type_name: &str, field_name: &str, subgraph_idx: usize) {
        let subgraph_name = self.subgraph_name(subgraph_idx).to_owned();

        self.origins
            .entry((type_name.to_owned(), field_name.to_owned()))
            .or_default()
            .insert(subgraph_name);
    }

    pub(super) fn finish(self) -> Federated {
        let (configuration, subgraph_configurations) = configuration::merge_configuration(
            self.subgraphs,
            &self.overrides,
            &self.entity_interface_concrete_types,
            self.diagnostics,
        );

        let mut schema = self.schema;

        for definition in schema.types.values_mut() {
            definition.sort();
        }

        Federated {
            schema,
            configuration,
            subgraph_configurations,
            origins: self.origins,
            subscription_filters: self.subscription_filters,
        }
    }
}

use crate::{Diagnostics, FederatedGraph, InputError};

/// The result of a [`compose()`](crate::compose()) invocation.
pub struct CompositionResult {
    pub(crate) federated_graph: Option<FederatedGraph>,
    pub(crate) diagnostics: Diagnostics,
}

impl CompositionResult {
    pub(crate) fn failed(diagnostics: Diagnostics) -> Self {
        CompositionResult {
            federated_graph: None,
            diagnostics,
        }
    }

    /// Simplify the result data to a yes-no answer: did composition succeed?
    ///
    /// `Ok()` contains the federated graph.
    /// `Err()` contains all diagnostics.
    pub fn into_result(self) -> Result<FederatedGraph, Diagnostics> {
        match self.federated_graph {
            Some(federated_graph) if !self.diagnostics.any_fatal() => Ok(federated_graph),
            _ => Err(self.diagnostics),
        }
    }

    /// The federated graph, when composition succeeded.
    pub fn federated_graph(&self) -> Option<&FederatedGraph> {
        self.federated_graph.as_ref()
    }

    /// Composition warnings and errors.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

impl From<InputError> for CompositionResult {
    fn from(error: InputError) -> Self {
        CompositionResult::failed(error.into())
    }
}

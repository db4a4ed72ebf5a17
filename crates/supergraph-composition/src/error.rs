/// Errors that abort a composition run before any subgraph is merged. They are never combined
/// with other diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("At least one subgraph is required for federation.")]
    NoSubgraphs,
    #[error("The subgraph at position {position} has an empty name. Subgraph names must be non-empty.")]
    EmptySubgraphName { position: usize },
    #[error(r#"The subgraph name "{0}" is used more than once. Subgraph names must be unique."#)]
    DuplicateSubgraphName(String),
    #[error(r#"Invalid router compatibility version "{0}"."#)]
    InvalidRouterCompatibilityVersion(String),
    #[error("[{subgraph}] The schema could not be parsed: {message}")]
    Syntax { subgraph: String, message: String },
}

impl InputError {
    pub(crate) fn kind(&self) -> crate::DiagnosticKind {
        match self {
            InputError::InvalidRouterCompatibilityVersion(_) => crate::DiagnosticKind::Version,
            InputError::Syntax { .. } => crate::DiagnosticKind::Syntax,
            InputError::NoSubgraphs | InputError::EmptySubgraphName { .. } | InputError::DuplicateSubgraphName(_) => {
                crate::DiagnosticKind::InvalidInput
            }
        }
    }
}

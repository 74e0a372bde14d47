use vigil_core::EntityId;

/// Errors raised by the AI layer
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("Unknown behavior '{0}'")]
    UnknownBehavior(String),

    #[error("Behavior '{behavior}' is missing argument '{argument}'")]
    MissingArgument {
        behavior: &'static str,
        argument: &'static str,
    },

    #[error("Behavior '{behavior}' got invalid argument '{value}'")]
    InvalidArgument { behavior: &'static str, value: String },

    #[error("Actor '{name}' ({id}) could not bind script '{label}'")]
    UnresolvedScript {
        id: EntityId,
        name: String,
        label: String,
    },

    #[error("Unsupported archive version {found} (expected {expected})")]
    ArchiveVersion { found: u32, expected: u32 },

    #[error("Archive error: {0}")]
    Archive(#[from] serde_json::Error),
}

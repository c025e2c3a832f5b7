//! Error types shared by the parser, the model gateway and the generation
//! pipeline.

use thiserror::Error;

/// A generation request that cannot be accepted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("topic is required")]
    BlankTopic,

    #[error("slide count must be between {min} and {max} (got {actual})")]
    SlideCountOutOfRange { actual: u32, min: u32, max: u32 },

    #[error("{field} is required")]
    MissingField { field: &'static str },
}

/// Failure talking to the generative text API.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway is misconfigured: {0}")]
    Config(String),

    #[error("request to model API failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("model API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("unexpected model API response: {0}")]
    Envelope(String),

    #[error("model API response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Top-level parser failure. Malformed model output is not an error; it
/// degrades to the fallback strategy or an empty outline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("model output is too large to parse ({actual} bytes, limit {limit})")]
    InputTooLarge { actual: usize, limit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("generation not found: {id}")]
pub struct NotFoundError {
    pub id: String,
}

/// Failure reading or changing the generation status table.
#[derive(Debug, Error)]
pub enum StatusError {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error("status store failed")]
    Store(#[source] anyhow::Error),
}

/// Pipeline step that produced a [`GenerationError::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Model,
    Parse,
    BuildArtifact,
    StoreArtifact,
    Status,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Model => "model call",
            Self::Parse => "outline parse",
            Self::BuildArtifact => "artifact build",
            Self::StoreArtifact => "artifact store",
            Self::Status => "status update",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("invalid generation request: {0}")]
    Invalid(#[from] ValidationError),

    #[error("presentation generation {id} failed during {stage}")]
    Failed {
        id: String,
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },

    #[error("outline preview failed during {stage}")]
    Preview {
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },
}

impl GenerationError {
    /// Id of the generation record this failure was recorded against, if any.
    pub fn generation_id(&self) -> Option<&str> {
        match self {
            Self::Failed { id, .. } => Some(id),
            Self::Invalid(_) | Self::Preview { .. } => None,
        }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Failed { stage, .. } | Self::Preview { stage, .. } => Some(*stage),
            Self::Invalid(_) => None,
        }
    }
}

use thiserror::Error;

/// Local failures of the flow core, raised before anything reaches the network.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FlowError {
    #[error("flow document has no screens")]
    EmptyDocument,
}

/// Failures talking to the WhatsApp Cloud API.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The provider answered with an error; `message` is its text, unchanged.
    #[error("whatsapp rejected the request (status {status}): {message}")]
    UpstreamRejected { status: u16, message: String },
    #[error("`{0}` not found")]
    NotFound(String),
    #[error("invalid recipient `{0}`")]
    InvalidRecipient(String),
    #[error("missing whatsapp setting `{0}`")]
    MissingCredential(&'static str),
    #[error("unsupported media type `{0}`")]
    UnsupportedMedia(String),
    #[error("unexpected whatsapp response: {0}")]
    Decode(String),
    #[error("whatsapp transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Flow(#[from] FlowError),
}

impl GatewayError {
    /// Stable short code used for metrics labels and API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::UpstreamRejected { .. } => "upstream_rejected",
            GatewayError::NotFound(_) => "not_found",
            GatewayError::InvalidRecipient(_) => "invalid_recipient",
            GatewayError::MissingCredential(_) => "missing_credential",
            GatewayError::UnsupportedMedia(_) => "unsupported_media",
            GatewayError::Decode(_) => "decode",
            GatewayError::Transport(_) => "transport",
            GatewayError::Flow(_) => "flow",
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

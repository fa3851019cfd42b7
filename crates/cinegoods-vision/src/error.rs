use thiserror::Error;

/// Errors returned by the generation client and response parser.
#[derive(Debug, Error)]
pub enum VisionError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP 429 from the generation service.
    #[error("rate limited by model {model}")]
    RateLimited { model: String },

    /// Any other non-2xx reply.
    #[error("generation API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// A 2xx reply that carried no candidate text.
    #[error("model {model} returned no text")]
    EmptyResponse { model: String },

    /// The model's text could not be recovered as a JSON object.
    #[error("could not parse model response: {reason}")]
    Parse { reason: String },

    #[error("no models configured")]
    NoModels,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generator credential is missing (set GEMINI_API_KEY)")]
    MissingCredential,

    #[error("upstream call failed (stage={stage}): {detail}")]
    Upstream {
        stage: &'static str,
        detail: String,
        raw_output: Option<String>,
    },

    #[error("upstream returned no text")]
    EmptyResponse,

    #[error("upstream text is not a valid draft object: {detail}")]
    InvalidResponse {
        detail: String,
        raw_output: String,
    },
}

impl GenerationError {
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::MissingCredential => "missing_credential",
            GenerationError::Upstream { .. } => "upstream",
            GenerationError::EmptyResponse => "empty_response",
            GenerationError::InvalidResponse { .. } => "invalid_response",
        }
    }

    pub fn raw_output(&self) -> Option<&str> {
        match self {
            GenerationError::Upstream { raw_output, .. } => raw_output.as_deref(),
            GenerationError::InvalidResponse { raw_output, .. } => Some(raw_output),
            _ => None,
        }
    }
}

use cdp_adapter::AdapterError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PerceiverError {
    #[error("root node '{0}' missing from capture")]
    RootMissing(String),
    #[error("probe failed: {0}")]
    Probe(String),
    #[error("malformed probe payload: {0}")]
    Malformed(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl PerceiverError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<AdapterError> for PerceiverError {
    fn from(err: AdapterError) -> Self {
        Self::Probe(err.to_string())
    }
}

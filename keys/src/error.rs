use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("key text round-trip failed: {0}")]
    Roundtrip(#[from] uuid::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown generator kind `{0}` (expected one of: random, time-ordered, broken)")]
pub struct ParseKindError(pub String);

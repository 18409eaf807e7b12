use thiserror::Error;

/// Rejections of user commands. None of these alter the clock state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    #[error("a run is already in progress")]
    AlreadyRunning,

    #[error("invalid prediction window: {0}")]
    InvalidWindow(u64),

    #[error("prediction already placed for window {0}")]
    PredictionAlreadyPlaced(u64),

    #[error("tracked player {0} is not on either roster")]
    UnknownPlayer(String),
}

/// Why a narration attempt was abandoned in favor of the fallback generator.
#[derive(Error, Debug)]
pub enum NarrationError {
    #[error("narration endpoint not configured")]
    Disabled,

    #[error("narration request timed out")]
    Timeout,

    #[error("narration request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("narration endpoint returned status {0}")]
    Status(u16),

    #[error("narration response is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("narration response failed validation: {0}")]
    Shape(String),
}

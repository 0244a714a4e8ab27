use thiserror::Error;

#[derive(Error, Debug)]
pub enum NarrativeError {
    #[error("Invalid trigger bound: {0}")]
    InvalidBound(String),
    #[error("Invalid slot width: {0}")]
    InvalidSlotWidth(String),
    #[error("Invalid toggle actions: {0}")]
    InvalidToggleActions(String),
    #[error("Scene already registered: {0}")]
    DuplicateScene(String),
    #[error("Unknown scene: {0}")]
    UnknownScene(String),
    #[error("Phase label appears more than once: {0}")]
    DuplicatePhase(String),
    #[error("Timeline has no horizontal travel phase")]
    MissingTravelPhase,
    #[error("Scene '{scene}' is missing anchor '{anchor}'")]
    MissingAnchor { scene: String, anchor: String },
    #[error("Master motion already published for this build")]
    AlreadyPublished,
    #[error(transparent)]
    Config(#[from] serde_json::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Precondition of '{action}' is false in the current world")]
    InvalidPrecondition { action: String },

    #[error("{entity} index {index} out of range (len {len})")]
    IndexOutOfRange {
        entity: &'static str,
        index:  usize,
        len:    usize,
    },

    #[error("Actor '{actor}' already has an action in flight")]
    AgentBusy { actor: String },

    #[error("Unit {unit} is being handled by the carrier")]
    UnitReserved { unit: usize },

    #[error("Time step must be finite and > 0, got {dt}")]
    InvalidTimeStep { dt: f64 },

    #[error("World invariant violated: {0}")]
    InvariantViolated(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

use thiserror::Error;

/// What an event handler returns on failure.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

pub type HandlerResult = Result<(), HandlerError>;

/// Why a handler invocation failed.  Only ever logged: `emit` never
/// propagates handler failures to the publisher.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("handler returned error: {0}")]
    Handler(HandlerError),

    #[error("handler panicked: {0}")]
    HandlerPanicked(String),
}

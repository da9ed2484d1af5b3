use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("route parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RouteResult<T> = Result<T, RouteError>;

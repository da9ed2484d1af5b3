use ft_core::CoreError;
use ft_route::RouteError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("simulation configuration error: {0}")]
    Config(#[from] CoreError),

    #[error("could not start simulation worker: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("roster parse error: {0}")]
    Roster(String),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("simulation driver is stopped")]
    Stopped,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SimResult<T> = Result<T, SimError>;

/// Why one entity could not be advanced this tick.  Never fatal: the entity
/// keeps its previous position.
#[derive(Debug, Error, PartialEq)]
pub enum MotionError {
    #[error("speed is not finite ({0})")]
    NonFiniteSpeed(f64),

    #[error("route progress is not finite ({0})")]
    NonFiniteProgress(f64),

    #[error("computed position is not finite")]
    NonFinitePosition,

    #[error("route has no usable length")]
    DegenerateRoute,
}

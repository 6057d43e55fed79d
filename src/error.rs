pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Required metadata field absent or malformed.
    #[error("invalid multiscale metadata: {0}")]
    Schema(String),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    /// Independently-derived dimensionalities disagree.
    #[error("inconsistent dimensionality in {field}: expected {expected}, got {actual}")]
    Dimensionality {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    /// An axis referenced in `coordinateArrays` is not in the axis list.
    #[error("unknown axis {0:?} in coordinateArrays")]
    UnknownAxis(String),
    #[error("incompatible storage backend: {family} store cannot hold this metadata dialect")]
    IncompatibleBackend { family: String },
    #[error("scale level {index} out of range for multiscale of length {len}")]
    IndexOutOfRange { index: isize, len: usize },
    #[error("unsupported coordinate transformation: {0}")]
    UnsupportedTransform(String),
    #[error("resolution of axis {axis:?} is not strictly positive ({resolution})")]
    NonMonotonic { axis: String, resolution: f64 },
    #[error(
        "inconsistent spacing on axis {axis:?}: difference spread {spread} exceeds tolerance {tolerance}"
    )]
    InconsistentSpacing {
        axis: String,
        spread: f64,
        tolerance: f64,
    },
    #[error(transparent)]
    Wrapped(Box<dyn std::error::Error>),
}

impl Error {
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    pub fn wrap(error: impl std::error::Error + 'static) -> Self {
        Self::Wrapped(Box::new(error))
    }
}

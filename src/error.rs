use std::fmt;
use thiserror::Error;

/// The three axes of a map file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapAxis {
    Segment,
    Variable,
    Time,
}

impl fmt::Display for MapAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapAxis::Segment => write!(f, "segment"),
            MapAxis::Variable => write!(f, "variable"),
            MapAxis::Time => write!(f, "time"),
        }
    }
}

#[derive(Debug, Error)]
pub enum WaqError {
    #[error("malformed {source_name}: {reason}")]
    Format { source_name: String, reason: String },

    /// `start..end` is the half-open range of accepted values.
    #[error("{axis} index {value} is outside {start}..{end}")]
    Index { axis: MapAxis, value: usize, start: usize, end: usize },

    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("no maximum could be selected: {0}")]
    Selection(String),

    #[error("no finite values to reduce in {0}")]
    EmptyReduction(&'static str),

    #[error("variable {name:?} is not in the map file (available: {})", available.join(", "))]
    UnknownVariable { name: String, available: Vec<String> },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Tiff(#[from] tiff::TiffError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl WaqError {
    pub(crate) fn format(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        WaqError::Format { source_name: source_name.into(), reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, WaqError>;

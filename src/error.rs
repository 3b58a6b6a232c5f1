use std::path::PathBuf;

use samarth_types::{ErrorDescriptor, ErrorKind};

/// Expected, recoverable outcomes of an engine or parser call.
///
/// None of these abort a request: they cross the result boundary as an
/// [`ErrorDescriptor`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    #[error("State '{0}' not found or no data available")]
    RegionNotFound(String),

    #[error("{}", category_not_found_message(.category, .region.as_deref(), .suggestions, .available))]
    CategoryNotFound {
        category: String,
        region: Option<String>,
        suggestions: Vec<String>,
        available: Vec<String>,
    },

    #[error("{0}")]
    NoData(String),

    #[error("Insufficient data for trend analysis: {points} valid year(s), need at least 2")]
    InsufficientData { points: usize },

    #[error("Unsupported array shape: {0}")]
    Shape(String),

    #[error("Could not retrieve rainfall data for any state ({})", .regions.join(", "))]
    AllFailed { regions: Vec<String> },

    #[error("No production data found in crop dataset")]
    NoCategories,

    #[error("Could not understand the question")]
    Unparsed,
}

fn category_not_found_message(
    category: &str,
    region: Option<&str>,
    suggestions: &[String],
    available: &[String],
) -> String {
    let mut msg = format!("Crop '{category}' not found in dataset");
    if let Some(region) = region {
        msg.push_str(&format!(" for {region}"));
    }
    if !suggestions.is_empty() {
        msg.push_str(&format!(". Did you mean: {}?", suggestions.join(", ")));
    } else if !available.is_empty() {
        let head: Vec<&str> = available.iter().take(10).map(String::as_str).collect();
        msg.push_str(&format!(". Available crops include: {}", head.join(", ")));
    }
    msg
}

impl QueryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::RegionNotFound(_) => ErrorKind::RegionNotFound,
            QueryError::CategoryNotFound { .. } => ErrorKind::CategoryNotFound,
            QueryError::NoData(_) => ErrorKind::NoData,
            QueryError::InsufficientData { .. } => ErrorKind::InsufficientData,
            QueryError::Shape(_) => ErrorKind::ShapeError,
            QueryError::AllFailed { .. } => ErrorKind::AllFailed,
            QueryError::NoCategories => ErrorKind::NoCategories,
            QueryError::Unparsed => ErrorKind::UnparsedQuery,
        }
    }

    pub fn suggestions(&self) -> &[String] {
        match self {
            QueryError::CategoryNotFound { suggestions, .. } => suggestions,
            _ => &[],
        }
    }
}

impl From<QueryError> for ErrorDescriptor {
    fn from(err: QueryError) -> Self {
        ErrorDescriptor {
            error: err.to_string(),
            kind: err.kind(),
            suggestions: err.suggestions().to_vec(),
        }
    }
}

/// Failures reading the already-parsed datasets. These abort the process.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed dataset: {0}")]
    Shape(String),

    #[error("no *{suffix} file found in {}", .dir.display())]
    MissingInput { dir: PathBuf, suffix: &'static str },
}

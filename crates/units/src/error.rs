//! Error types for unit execution.

use flowunit_http_tools::HttpToolsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UnitError {
    /// A per-call failure outside of any batch item (e.g. while supplying a tool).
    #[error(transparent)]
    Call(#[from] HttpToolsError),

    /// A batch item failed and the batch was aborted.
    #[error("item {index} failed: {source}")]
    ItemFailed {
        index: usize,
        #[source]
        source: HttpToolsError,
    },

    /// Unknown unit kind in a catalog lookup.
    #[error("unknown unit: {0}")]
    UnknownUnit(String),

    /// The unit does not support the requested mode or operation.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl UnitError {
    /// Index of the failing batch item, if this error came from one.
    #[must_use]
    pub fn item_index(&self) -> Option<usize> {
        match self {
            Self::ItemFailed { index, .. } => Some(*index),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, UnitError>;

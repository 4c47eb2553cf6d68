//! Error taxonomy for every pipeline stage.
//!
//! Build-time problems ([`ComposeError`]) abort before any layout work,
//! layout problems ([`PaginationError`]) abort before emission, and emission
//! problems ([`EmitError`]) keep their underlying I/O cause.

use thiserror::Error;

/// Invariant violations in an [`InvoiceModel`](crate::model::InvoiceModel).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("due date {due} is before issue date {issue}")]
    DueBeforeIssue { issue: String, due: String },

    #[error("order item {index} has an empty name")]
    EmptyItemName { index: usize },

    #[error("order item {index} has a zero quantity")]
    ZeroQuantity { index: usize },
}

/// Errors raised while building the layout tree or preparing it for layout.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// A style references a font name that was never registered.
    #[error("font '{name}' is not registered")]
    UnresolvedFont { name: String },

    /// A single-slot container received a second child.
    #[error("slot '{slot}' already holds a child")]
    MultipleChildren { slot: &'static str },

    #[error("invalid {constraint} constraint: {value}")]
    InvalidConstraint { constraint: &'static str, value: f32 },

    #[error("style '{name}' is not registered")]
    UnknownStyle { name: String },

    #[error("style '{name}' is already registered")]
    DuplicateStyle { name: String },

    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("failed to parse font '{name}': {reason}")]
    FontParse { name: String, reason: String },

    #[error("failed to read font '{name}'")]
    FontLoad {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl ComposeError {
    pub(crate) fn constraint(constraint: &'static str, value: f32) -> Self {
        Self::InvalidConstraint { constraint, value }
    }
}

/// Errors raised by the pagination engine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PaginationError {
    /// Substituting the final page count changed the page count.
    #[error("pagination did not converge: estimated {estimated} pages, final pass produced {actual}")]
    Divergence { estimated: usize, actual: usize },

    /// Content taller than a page under [`OverflowPolicy::Fail`](crate::pipeline::OverflowPolicy).
    #[error("content on page {page} needs {required:.1}pt but only {available:.1}pt is available")]
    Overflow {
        page: usize,
        required: f32,
        available: f32,
    },

    #[error("document exceeds the limit of {limit} pages")]
    PageLimitExceeded { limit: usize },

    #[error("row layout failed: {0}")]
    Layout(String),
}

/// Errors raised while writing a finished document.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("output sink rejected a write")]
    SinkWrite(#[source] std::io::Error),

    #[error("font '{name}' is not registered")]
    UnresolvedFont { name: String },

    #[error("failed to serialise layout")]
    Serialize(#[source] serde_json::Error),
}

/// Any failure of the generation pipeline.
#[derive(Debug, Error)]
pub enum ForgeError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error(transparent)]
    Pagination(#[from] PaginationError),

    #[error(transparent)]
    Emit(#[from] EmitError),
}

//! Error types for layout validation and ID generation.
//!
//! Both variants are local validation failures raised before any generator
//! state is touched, so callers can surface them directly; there is nothing
//! to retry internally. Clock stalls are deliberately not an error: the
//! generator blocks until the clock advances instead of timing out.

pub type Result<T> = core::result::Result<T, Error>;

/// All errors that `graupel` can produce.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The caller-supplied node identifier does not fit the layout's node
    /// field.
    ///
    /// Raised by `next_id`/`next_id_at` before any state mutation. Treat as
    /// a programming or configuration error: node identifiers must be within
    /// `[0, Layout::max_node_id()]`.
    #[error("node id {node_id} out of range: must be within [0, {max}]")]
    InvalidNodeId { node_id: u64, max: u64 },

    /// A custom layout violated the bit-split rules.
    ///
    /// Raised by [`Layout::custom`]; the invalid layout is never
    /// constructed.
    ///
    /// [`Layout::custom`]: crate::Layout::custom
    #[error("invalid layout: {reason}")]
    InvalidLayout { reason: String },
}

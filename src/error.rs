use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by the clustering engine, the table source and the session layer.
///
/// The `Display` text of every variant is what a client sees after `ERROR: `,
/// so messages are written for the remote user rather than for a log file.
#[derive(Debug, Error)]
pub enum Error {
    /// The dataset has no examples.
    #[error("dataset is empty")]
    EmptyDataset,

    /// The radius grouped every example into a single cluster.
    #[error("radius {radius} grouped all {n_items} examples into a single cluster; try a smaller radius")]
    ClusteringRadius {
        /// Radius used for the run.
        radius: f64,
        /// Number of examples in the dataset.
        n_items: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Human-readable explanation.
        message: String,
    },

    /// `compute` was called on an engine restored from storage.
    #[error("radius is unknown for a clustering restored from storage")]
    RadiusUnset,

    /// Two tuples of different length were compared.
    #[error("tuple length mismatch: expected {expected}, found {found}")]
    TupleLengthMismatch {
        /// Length of the receiving tuple.
        expected: usize,
        /// Length of the other tuple.
        found: usize,
    },

    /// An example index outside the dataset.
    #[error("example index {index} out of range for {len} examples")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of examples.
        len: usize,
    },

    /// A value whose kind does not match its attribute.
    #[error("value for attribute '{attribute}' has the wrong kind: expected {expected}")]
    ValueKindMismatch {
        /// Attribute name.
        attribute: String,
        /// Expected kind.
        expected: &'static str,
    },

    /// A table row with the wrong number of values.
    #[error("row {row} has {found} values, expected {expected}")]
    RowLength {
        /// Row index.
        row: usize,
        /// Number of attributes.
        expected: usize,
        /// Number of values found.
        found: usize,
    },

    /// Table names are restricted to ASCII letters, digits, `_` and `-`.
    #[error("invalid table name '{0}'")]
    InvalidTableName(String),

    /// No table with that name exists in the data directory.
    #[error("table '{0}' not found")]
    TableNotFound(String),

    /// The table has no column usable as an attribute.
    #[error("table '{0}' has no numeric or textual columns")]
    NoAttributes(String),

    /// Failure reading or parsing the table.
    #[error("table source error: {0}")]
    Source(#[from] polars::prelude::PolarsError),

    /// CLUSTER before LOAD_DATASET.
    #[error("no dataset loaded")]
    NoDataset,

    /// SAVE_RESULT before any result exists.
    #[error("no result to save")]
    NoResult,

    /// LOAD_RESULT on a path that does not exist.
    #[error("result file not found: {}", .0.display())]
    ResultNotFound(PathBuf),

    /// A result file that is not a valid cluster document.
    #[error("corrupt result file: {0}")]
    CorruptResult(#[from] serde_json::Error),

    /// A result file with a version this build does not understand.
    #[error("unsupported result file version {found} (supported: {supported})")]
    UnsupportedVersion {
        /// Version found.
        found: u32,
        /// Version this build reads and writes.
        supported: u32,
    },

    /// A request frame carrying a protocol version this build does not speak.
    #[error("unsupported protocol version {found} (supported: {supported})")]
    UnsupportedProtocolVersion {
        /// Version sent by the client.
        found: u32,
        /// Version this build speaks.
        supported: u32,
    },

    /// A request payload of the wrong JSON type.
    #[error("invalid payload for {opcode}: expected {expected}")]
    InvalidPayload {
        /// Operation name.
        opcode: &'static str,
        /// Expected payload kind.
        expected: &'static str,
    },

    /// A frame that is not a valid request or reply.
    #[error("malformed frame: {0}")]
    MalformedFrame(serde_json::Error),

    /// A frame longer than the session accepts.
    #[error("frame exceeds {limit} bytes")]
    FrameTooLarge {
        /// Maximum frame length in bytes.
        limit: u64,
    },

    /// The peer closed the connection in the middle of a frame.
    #[error("connection closed mid-frame")]
    TruncatedFrame,

    /// A blocking job (table load, clustering run) panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;

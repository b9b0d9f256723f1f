//! Wire protocol types.
//!
//! Frames are newline-delimited JSON objects. A request names an integer opcode and
//! carries one payload value; every request gets exactly one reply.
//!
//! ```text
//! -> {"version":1,"opcode":1,"payload":0.5}
//! <- {"status":"OK","cluster_count":2,"rendering":"1:Centroid=(...)..."}
//! ```

use serde::{Deserialize, Serialize};

/// Protocol version spoken by this build.
pub const PROTOCOL_VERSION: u32 = 1;

/// Status token of a successful reply.
pub const STATUS_OK: &str = "OK";

/// Prefix of the status token of a failed reply.
pub const STATUS_ERROR_PREFIX: &str = "ERROR: ";

fn default_version() -> u32 {
    PROTOCOL_VERSION
}

/// Session operations by opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// Payload: table name.
    LoadDataset,
    /// Payload: radius.
    Cluster,
    /// Payload: destination path.
    SaveResult,
    /// Payload: source path.
    LoadResult,
}

impl Opcode {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Opcode::LoadDataset),
            1 => Some(Opcode::Cluster),
            2 => Some(Opcode::SaveResult),
            3 => Some(Opcode::LoadResult),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Opcode::LoadDataset => 0,
            Opcode::Cluster => 1,
            Opcode::SaveResult => 2,
            Opcode::LoadResult => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Opcode::LoadDataset => "LOAD_DATASET",
            Opcode::Cluster => "CLUSTER",
            Opcode::SaveResult => "SAVE_RESULT",
            Opcode::LoadResult => "LOAD_RESULT",
        }
    }
}

/// One request frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default = "default_version")]
    pub version: u32,
    pub opcode: i64,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Request {
    pub fn new(opcode: i64, payload: impl Into<serde_json::Value>) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            opcode,
            payload: payload.into(),
        }
    }

    pub fn load_dataset(table: &str) -> Self {
        Self::new(Opcode::LoadDataset.code(), table)
    }

    pub fn cluster(radius: f64) -> Self {
        Self::new(Opcode::Cluster.code(), radius)
    }

    pub fn save_result(path: &str) -> Self {
        Self::new(Opcode::SaveResult.code(), path)
    }

    pub fn load_result(path: &str) -> Self {
        Self::new(Opcode::LoadResult.code(), path)
    }
}

/// One reply frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    /// `"OK"` or `"ERROR: <message>"`.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendering: Option<String>,
}

impl Reply {
    pub fn ok() -> Self {
        Self {
            status: STATUS_OK.to_string(),
            cluster_count: None,
            rendering: None,
        }
    }

    pub fn error(message: impl std::fmt::Display) -> Self {
        Self {
            status: format!("{}{}", STATUS_ERROR_PREFIX, message),
            cluster_count: None,
            rendering: None,
        }
    }

    pub fn with_cluster_count(mut self, count: usize) -> Self {
        self.cluster_count = Some(count);
        self
    }

    pub fn with_rendering(mut self, rendering: impl Into<String>) -> Self {
        self.rendering = Some(rendering.into());
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }

    /// Message of an error reply, `None` for `OK`.
    pub fn error_message(&self) -> Option<&str> {
        self.status.strip_prefix(STATUS_ERROR_PREFIX)
    }
}

//! qtserver: Quality-Threshold clustering served over TCP
//!
//! A client loads a table, asks for a clustering at a given radius, and can save
//! the resulting grouping to disk and load it back later. The engine is the greedy
//! QT algorithm: repeatedly take the largest radius-bounded cluster around some
//! unassigned example until every example is assigned.

pub mod cli;
pub mod client;
pub mod cluster;
pub mod data;
pub mod error;
pub mod model;
pub mod protocol;
pub mod server;
pub mod session;
pub mod storage;
pub mod tuple;

// Re-export public items for easier access
pub use cli::Args;
pub use client::{ClientError, QtClient};
pub use cluster::{Cluster, ClusterSet};
pub use data::{CsvTableSource, Dataset, TableSource};
pub use error::{Error, Result};
pub use model::QtMiner;
pub use protocol::{Opcode, Reply, Request};
pub use server::QtServer;
pub use session::{Session, SessionContext};
pub use tuple::{Attribute, AttributeKind, Item, Tuple, Value};

//! Rumorality node: wires the engines together behind one participant.
//!
//! The node is the coordinator that:
//! - Posts and deletes claims for the local participant
//! - Casts quadratic votes and pushes them to peers
//! - Seals open claims and settles stakes on a periodic pass
//! - Applies reputation decay
//! - Replicates claims and votes with peers over an injected transport
//!
//! All engine state sits behind one async lock; domain events are fanned
//! out through [`EventBus`] after the lock is released.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod shutdown;
pub mod tracing_spans;

pub use config::NodeConfig;
pub use error::NodeError;
pub use events::{CoreEvent, EventBus};
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use node::{Collaborators, NodeSnapshot, NodeState, RumorNode};
pub use shutdown::{ShutdownController, ShutdownSignal};

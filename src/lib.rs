pub mod clustering;
pub mod engine;
pub mod error;
pub mod importance;
pub mod layout;
pub mod logging;
pub mod mst;
pub mod output;
pub mod providers;
pub mod vector;

pub const TARGET_CLUSTERING: &str = "clustering";
pub const TARGET_LAYOUT: &str = "layout";
pub const TARGET_PROVIDER: &str = "provider_request";

pub use engine::{ClusterLayoutEngine, EngineConfig};
pub use error::{EngineError, Result};

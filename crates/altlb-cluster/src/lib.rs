//! altlb Cluster - Live node discovery, selection and refresh scheduling
//!
//! - `fetch`: HTTP transport seam for discovery calls
//! - `discovery`: the `/localnodes` protocol client
//! - `membership`: lock-free node list with round-robin selection
//! - `scheduler`: active/idle refresh scheduling
//! - `topology`: rack/datacenter awareness checks
//! - `live_nodes`: the public directory tying it all together

pub mod discovery;
pub mod fetch;
pub mod live_nodes;
pub mod membership;
pub mod scheduler;
pub mod topology;

pub use discovery::*;
pub use fetch::*;
pub use live_nodes::*;
pub use membership::*;
pub use scheduler::*;
pub use topology::*;

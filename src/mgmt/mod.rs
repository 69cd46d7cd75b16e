//! Remote management: wire protocol, object naming/queries and the
//! client used by readiness conditions and the supervisor.

pub mod client;
pub mod protocol;
pub mod query;

pub use client::ManagementClient;
pub use protocol::{McRequest, McResponse, ObjectInfo, OperationInfo, ParamInfo};
pub use query::{ObjectName, ObjectQuery};

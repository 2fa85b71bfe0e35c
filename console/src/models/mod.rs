//! Domain models shared by the execution, session and terminal subsystems

pub mod canary;
pub mod execution;
pub mod host;
pub mod task;

pub use canary::{CanaryResult, CanaryStatus, HostTarget};
pub use execution::{ExecutionSession, ExecutionStatus, HostExecutionRecord};
pub use host::{Host, HostGroup, HostId};
pub use task::{ExecutableTask, SessionEncoding, TaskId, TaskKind, TaskRef};

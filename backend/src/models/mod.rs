//! Domain models for the cluster simulator

pub mod event;
pub mod job;
pub mod mask;
pub mod node;
pub mod result;

// Re-exports
pub use event::{EventLevel, SimEvent};
pub use job::{ActiveJob, RunningJob, SwfRecord, TraceJob};
pub use mask::AdmissionMask;
pub use node::NodeStructure;
pub use result::{JobResult, ResultParseError};

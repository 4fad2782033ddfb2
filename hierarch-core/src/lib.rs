//! HIERARCH Core - Entity Types
//!
//! Data structures shared by every HIERARCH crate: typed identifiers, the
//! agent/message/task entities, the error taxonomy, and configuration.
//! Coordination logic lives in `hierarch-agents`.

mod agent;
mod config;
mod enums;
mod error;
mod identity;
mod message;
mod task;

pub use agent::{Agent, AgentSpec};
pub use config::{HierarchConfig, DEFAULT_MAX_REASONING_STEPS, DEFAULT_STALE_AFTER_SECS};
pub use enums::{AgentLevel, AgentType, EnumParseError, MessagePriority, MessageType, TaskState};
pub use error::{
    ConfigError, EntityType, GovernanceError, HierarchError, HierarchResult, NotFoundError,
    StateError, StorageError, ValidationError,
};
pub use identity::{AgentId, EntityId, EntityIdType, MessageId, TaskId, Timestamp, TraceId};
pub use message::{Message, MessagePayload};
pub use task::{
    ApprovalEvidence, ReasoningStep, ResourceUsage, Task, TaskInput, TaskOutput, VETO_VIOLATION,
};

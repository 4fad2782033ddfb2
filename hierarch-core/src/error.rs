//! Error types for HIERARCH operations

use crate::{AgentId, AgentLevel, AgentType, TaskId, TaskState};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Entity type discriminator used in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Agent,
    Message,
    Task,
}

/// Malformed input rejected before any state changes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Level mismatch: agent type {agent_type} lives at {expected}, got {got}")]
    LevelMismatch {
        agent_type: AgentType,
        expected: AgentLevel,
        got: AgentLevel,
    },

    #[error("Invalid hierarchy: {supervisor} at {supervisor_level} cannot supervise an agent at {level}")]
    InvalidHierarchy {
        supervisor: AgentId,
        supervisor_level: AgentLevel,
        level: AgentLevel,
    },
}

/// Unknown identifier.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Entity not found: {entity_type:?} with id {id}")]
pub struct NotFoundError {
    pub entity_type: EntityType,
    pub id: Uuid,
}

impl NotFoundError {
    pub fn new(entity_type: EntityType, id: impl Into<Uuid>) -> Self {
        Self {
            entity_type,
            id: id.into(),
        }
    }
}

/// Governance rule violations. These are the "unauthorized" outcomes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GovernanceError {
    #[error("Agent {agent_id} ({level}) may not veto: {reason}")]
    VetoNotPermitted {
        agent_id: AgentId,
        level: AgentLevel,
        reason: String,
    },

    #[error("Task {task_id} requires human approval before completion")]
    ApprovalRequired { task_id: TaskId },

    #[error("Approval for task {task_id} rejected: {reason}")]
    InvalidApproval { task_id: TaskId, reason: String },
}

/// Operation not valid for the task's current state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid state transition: cannot {operation} task {task_id} in state {from}")]
pub struct StateError {
    pub task_id: TaskId,
    pub from: TaskState,
    pub operation: String,
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// In-process store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Master error type for all HIERARCH errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HierarchError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Not found: {0}")]
    NotFound(#[from] NotFoundError),

    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] GovernanceError),

    #[error("{0}")]
    InvalidTransition(#[from] StateError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl HierarchError {
    pub fn is_validation(&self) -> bool {
        matches!(self, HierarchError::Validation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, HierarchError::NotFound(_))
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, HierarchError::Unauthorized(_))
    }

    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, HierarchError::InvalidTransition(_))
    }
}

/// Result type alias for HIERARCH operations.
pub type HierarchResult<T> = Result<T, HierarchError>;

// =============================================================================
// TESTS
// =============================================================================

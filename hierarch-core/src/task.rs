//! Task entity, reasoning trace, and approval evidence.
//!
//! The mutators here apply a change unconditionally; legality is decided by the
//! coordinator and its governance guard before any of them runs.

use crate::{AgentId, EntityIdType, TaskId, TaskState, Timestamp, ValidationError};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Violation entry appended by a successful veto.
pub const VETO_VIOLATION: &str = "L0 VETO";

/// What a task was created to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskInput {
    /// Perform a concrete action
    Action {
        action: String,
        #[serde(default)]
        parameters: BTreeMap<String, String>,
    },
    /// Study a subject and answer a question about it
    Analysis { subject: String, question: String },
    /// Check a target against criteria
    Review {
        target: String,
        #[serde(default)]
        criteria: Vec<String>,
    },
}

impl TaskInput {
    /// Shorthand for a parameterless action.
    pub fn action(action: impl Into<String>) -> Self {
        TaskInput::Action {
            action: action.into(),
            parameters: BTreeMap::new(),
        }
    }

    /// Reject inputs whose primary field is blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let (field, value) = match self {
            TaskInput::Action { action, .. } => ("action", action),
            TaskInput::Analysis { subject, .. } => ("subject", subject),
            TaskInput::Review { target, .. } => ("target", target),
        };
        if value.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: format!("input.{}", field),
            });
        }
        Ok(())
    }
}

/// Result attached to a completed task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TaskOutput {
    /// Summary of what was accomplished
    pub summary: String,
    /// References to produced artifacts
    #[serde(default)]
    pub artifacts: Vec<String>,
}

impl TaskOutput {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            artifacts: Vec::new(),
        }
    }

    /// Set produced artifacts.
    pub fn with_artifacts(mut self, artifacts: Vec<String>) -> Self {
        self.artifacts = artifacts;
        self
    }
}

/// One entry of the append-only reasoning trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ReasoningStep {
    /// 1-based position in the trace
    pub step: u32,
    pub action: String,
    pub detail: String,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub timestamp: Timestamp,
}

/// Resources consumed while working on a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ResourceUsage {
    pub tokens: u64,
    pub api_calls: u32,
    pub elapsed_ms: u64,
}

impl ResourceUsage {
    /// Saturating accumulation.
    pub fn accumulate(&mut self, other: ResourceUsage) {
        self.tokens = self.tokens.saturating_add(other.tokens);
        self.api_calls = self.api_calls.saturating_add(other.api_calls);
        self.elapsed_ms = self.elapsed_ms.saturating_add(other.elapsed_ms);
    }
}

/// Evidence of a human sign-off, supplied by the caller when completing a
/// task that requires approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ApprovalEvidence {
    /// Who approved (human identity as known to the calling layer)
    pub approver: String,
    /// When the approval was given
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub approved_at: Timestamp,
    /// External reference (ticket, checkpoint id)
    #[serde(default)]
    pub reference: Option<String>,
}

impl ApprovalEvidence {
    /// Approval given now.
    pub fn now(approver: impl Into<String>) -> Self {
        Self {
            approver: approver.into(),
            approved_at: Utc::now(),
            reference: None,
        }
    }

    /// Attach an external reference.
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// A coordinated task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Task {
    /// Unique identifier for this task
    pub task_id: TaskId,
    /// Owning/executing agent
    pub agent_id: AgentId,
    /// Current state
    pub state: TaskState,
    /// What the task was created to do
    pub input: TaskInput,
    /// Append-only reasoning trace
    pub reasoning_trace: Vec<ReasoningStep>,
    /// Accumulated resource usage
    pub resources_used: ResourceUsage,
    /// Append-only audit log of governance events
    pub violations: Vec<String>,
    /// Whether completion needs human approval evidence
    pub human_approval_required: bool,
    /// Output, set only on completion
    pub output: Option<TaskOutput>,
    /// Approval used to complete the task
    pub approval: Option<ApprovalEvidence>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    /// When the first reasoning step was recorded
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub started_at: Option<Timestamp>,
    /// When the task reached a terminal state
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub ended_at: Option<Timestamp>,
}

impl Task {
    /// Create a pending task.
    pub fn new(agent_id: AgentId, input: TaskInput, human_approval_required: bool) -> Self {
        Self {
            task_id: TaskId::now_v7(),
            agent_id,
            state: TaskState::Pending,
            input,
            reasoning_trace: Vec::new(),
            resources_used: ResourceUsage::default(),
            violations: Vec::new(),
            human_approval_required,
            output: None,
            approval: None,
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
        }
    }

    /// Number the next step would get.
    pub fn next_step_number(&self) -> u32 {
        self.reasoning_trace.len() as u32 + 1
    }

    /// Time of the latest recorded activity.
    pub fn last_activity(&self) -> Timestamp {
        self.reasoning_trace
            .last()
            .map(|s| s.timestamp)
            .unwrap_or(self.created_at)
    }

    /// Append a step, moving `Pending → Running` on the first one.
    pub fn push_step(&mut self, action: String, detail: String, now: Timestamp) {
        let step = self.next_step_number();
        self.reasoning_trace.push(ReasoningStep {
            step,
            action,
            detail,
            timestamp: now,
        });
        if self.state == TaskState::Pending {
            self.state = TaskState::Running;
            self.started_at = Some(now);
        }
    }

    /// Append an audit entry.
    pub fn record_violation(&mut self, entry: impl Into<String>) {
        self.violations.push(entry.into());
    }

    /// Move to a terminal state.
    pub fn finish(&mut self, state: TaskState, now: Timestamp) {
        debug_assert!(state.is_terminal());
        self.state = state;
        self.ended_at = Some(now);
    }
}

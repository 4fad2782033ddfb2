//! Inter-agent message envelopes.

use crate::{
    AgentId, EntityIdType, MessageId, MessagePriority, MessageType, TaskId, Timestamp, TraceId,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Message body. The variant decides the message type, so a payload can
/// never disagree with the envelope's `message_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagePayload {
    /// Work handed to the receiver
    TaskAssignment { task_id: TaskId, instructions: String },
    /// Progress report, optionally about a task
    StatusUpdate {
        task_id: Option<TaskId>,
        status: String,
    },
    /// Issue raised to a superior
    Escalation {
        task_id: Option<TaskId>,
        reason: String,
    },
    /// Request for sign-off on a task
    ApprovalRequest { task_id: TaskId, summary: String },
    /// Notice that a task was vetoed
    VetoNotice { task_id: TaskId, reason: String },
    /// Free-form coordination signal (e.g. "ready", "waiting")
    Coordination { signal: String },
}

impl MessagePayload {
    /// Message type implied by this payload.
    pub fn message_type(&self) -> MessageType {
        match self {
            MessagePayload::TaskAssignment { .. } => MessageType::TaskAssignment,
            MessagePayload::StatusUpdate { .. } => MessageType::StatusUpdate,
            MessagePayload::Escalation { .. } => MessageType::Escalation,
            MessagePayload::ApprovalRequest { .. } => MessageType::ApprovalRequest,
            MessagePayload::VetoNotice { .. } => MessageType::VetoNotice,
            MessagePayload::Coordination { .. } => MessageType::Coordination,
        }
    }

    /// Task this payload refers to, if any.
    pub fn task_id(&self) -> Option<TaskId> {
        match self {
            MessagePayload::TaskAssignment { task_id, .. }
            | MessagePayload::ApprovalRequest { task_id, .. }
            | MessagePayload::VetoNotice { task_id, .. } => Some(*task_id),
            MessagePayload::StatusUpdate { task_id, .. }
            | MessagePayload::Escalation { task_id, .. } => *task_id,
            MessagePayload::Coordination { .. } => None,
        }
    }
}

/// A message between two agents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Message {
    /// Unique identifier for this message
    pub message_id: MessageId,
    /// Type of message, derived from the payload
    pub message_type: MessageType,
    /// Agent sending the message
    pub from_agent_id: AgentId,
    /// Agent receiving the message
    pub to_agent_id: AgentId,
    /// Message body
    pub payload: MessagePayload,
    /// Message priority
    pub priority: MessagePriority,
    /// Whether the receiver must acknowledge
    pub requires_ack: bool,
    /// Conversation correlation id
    pub trace_id: TraceId,
    /// When the message was sent
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    /// Whether the message has been acknowledged
    pub acknowledged: bool,
    /// When the message was acknowledged
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub acknowledged_at: Option<Timestamp>,
}

impl Message {
    /// Create a new message. The trace id is fresh unless set afterwards.
    pub fn new(
        from_agent_id: AgentId,
        to_agent_id: AgentId,
        payload: MessagePayload,
        priority: MessagePriority,
        requires_ack: bool,
    ) -> Self {
        Self {
            message_id: MessageId::now_v7(),
            message_type: payload.message_type(),
            from_agent_id,
            to_agent_id,
            payload,
            priority,
            requires_ack,
            trace_id: TraceId::now_v7(),
            created_at: Utc::now(),
            acknowledged: false,
            acknowledged_at: None,
        }
    }

    /// Join an existing conversation.
    pub fn with_trace(mut self, trace_id: TraceId) -> Self {
        self.trace_id = trace_id;
        self
    }

    /// Mark as acknowledged. Returns false if it already was.
    pub fn mark_acknowledged(&mut self) -> bool {
        if self.acknowledged {
            return false;
        }
        self.acknowledged = true;
        self.acknowledged_at = Some(Utc::now());
        true
    }

    /// Whether this message still waits for an acknowledgment.
    pub fn is_awaiting_ack(&self) -> bool {
        self.requires_ack && !self.acknowledged
    }
}

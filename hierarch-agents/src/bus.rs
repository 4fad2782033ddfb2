//! Message bus between registered agents.

use crate::registry::AgentRegistry;
use hierarch_core::{
    AgentId, EntityType, HierarchResult, Message, MessageId, MessagePayload, MessagePriority,
    NotFoundError, TraceId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A send request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessage {
    pub from: AgentId,
    pub to: AgentId,
    pub payload: MessagePayload,
    #[serde(default)]
    pub priority: MessagePriority,
    #[serde(default)]
    pub requires_ack: bool,
    /// Conversation to join; a fresh trace is started when absent
    #[serde(default)]
    pub trace_id: Option<TraceId>,
}

impl SendMessage {
    /// Normal priority, no acknowledgment required, fresh trace.
    pub fn new(from: AgentId, to: AgentId, payload: MessagePayload) -> Self {
        Self {
            from,
            to,
            payload,
            priority: MessagePriority::Normal,
            requires_ack: false,
            trace_id: None,
        }
    }

    /// Set priority.
    pub fn with_priority(mut self, priority: MessagePriority) -> Self {
        self.priority = priority;
        self
    }

    /// Require (or not) an acknowledgment from the receiver.
    pub fn requiring_ack(mut self, requires_ack: bool) -> Self {
        self.requires_ack = requires_ack;
        self
    }

    /// Join an existing conversation.
    pub fn with_trace(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }
}

/// Messages in send order. Messages are never removed; the only mutation a
/// message ever sees is its single acknowledgment.
#[derive(Debug, Default, Clone)]
pub struct MessageBus {
    messages: Vec<Message>,
    index: HashMap<MessageId, usize>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send a message. Both endpoints must be registered (active or not).
    pub fn send(&mut self, registry: &AgentRegistry, request: SendMessage) -> HierarchResult<Message> {
        registry.get(request.from)?;
        registry.get(request.to)?;

        let mut message = Message::new(
            request.from,
            request.to,
            request.payload,
            request.priority,
            request.requires_ack,
        );
        if let Some(trace_id) = request.trace_id {
            message = message.with_trace(trace_id);
        }

        tracing::debug!(
            message_id = %message.message_id,
            message_type = %message.message_type,
            from = %message.from_agent_id,
            to = %message.to_agent_id,
            priority = %message.priority,
            requires_ack = message.requires_ack,
            "Message sent"
        );
        self.index.insert(message.message_id, self.messages.len());
        self.messages.push(message.clone());
        Ok(message)
    }

    /// Acknowledge a message. Acknowledging twice returns the message as it
    /// was after the first acknowledgment.
    pub fn acknowledge(&mut self, message_id: MessageId) -> HierarchResult<Message> {
        let position = *self
            .index
            .get(&message_id)
            .ok_or_else(|| NotFoundError::new(EntityType::Message, message_id))?;
        let message = &mut self.messages[position];
        if message.mark_acknowledged() {
            tracing::debug!(message_id = %message_id, "Message acknowledged");
        }
        Ok(message.clone())
    }

    pub fn get(&self, message_id: MessageId) -> HierarchResult<&Message> {
        self.index
            .get(&message_id)
            .map(|position| &self.messages[*position])
            .ok_or_else(|| NotFoundError::new(EntityType::Message, message_id).into())
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages that require an acknowledgment and have not received one,
    /// optionally only those addressed to `recipient`.
    pub fn unacknowledged(&self, recipient: Option<AgentId>) -> Vec<&Message> {
        self.messages
            .iter()
            .filter(|m| m.is_awaiting_ack())
            .filter(|m| recipient.map_or(true, |id| m.to_agent_id == id))
            .collect()
    }

    /// Every message addressed to `recipient`, in send order.
    pub fn inbox(&self, recipient: AgentId) -> Vec<&Message> {
        self.messages
            .iter()
            .filter(|m| m.to_agent_id == recipient)
            .collect()
    }

    /// Messages from `from` to `to`, in send order.
    pub fn conversation(&self, from: AgentId, to: AgentId) -> Vec<&Message> {
        self.messages
            .iter()
            .filter(|m| m.from_agent_id == from && m.to_agent_id == to)
            .collect()
    }
}

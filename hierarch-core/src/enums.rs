//! Enum types shared by the agent, message, and task entities.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error when parsing an enum from its string representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumParseError {
    /// Name of the enum being parsed
    pub kind: &'static str,
    /// The rejected input
    pub value: String,
}

impl fmt::Display for EnumParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid {}: {}", self.kind, self.value)
    }
}

impl std::error::Error for EnumParseError {}

fn normalize(s: &str) -> String {
    s.to_lowercase().replace(['_', '-', ' '], "")
}

// ============================================================================
// AGENT HIERARCHY
// ============================================================================

/// Hierarchy level of an agent. Lower numbers carry more authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum AgentLevel {
    /// Constitutional level, holds veto authority
    L0,
    /// Strategic coordination
    L1,
    /// Analysis and validation
    L2,
    /// Operational execution
    L3,
}

impl AgentLevel {
    /// All levels, most authoritative first.
    pub const ALL: [AgentLevel; 4] = [AgentLevel::L0, AgentLevel::L1, AgentLevel::L2, AgentLevel::L3];

    /// Numeric value of the level (0..=3).
    pub fn as_u8(&self) -> u8 {
        match self {
            AgentLevel::L0 => 0,
            AgentLevel::L1 => 1,
            AgentLevel::L2 => 2,
            AgentLevel::L3 => 3,
        }
    }

    /// Build a level from its numeric value.
    pub fn from_u8(level: u8) -> Option<Self> {
        match level {
            0 => Some(AgentLevel::L0),
            1 => Some(AgentLevel::L1),
            2 => Some(AgentLevel::L2),
            3 => Some(AgentLevel::L3),
            _ => None,
        }
    }

    /// Whether this level may supervise agents at `other`.
    pub fn outranks(&self, other: AgentLevel) -> bool {
        self.as_u8() < other.as_u8()
    }
}

impl fmt::Display for AgentLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.as_u8())
    }
}

impl FromStr for AgentLevel {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_start_matches(['L', 'l']);
        digits
            .parse::<u8>()
            .ok()
            .and_then(AgentLevel::from_u8)
            .ok_or_else(|| EnumParseError {
                kind: "agent level",
                value: s.to_string(),
            })
    }
}

/// Kind of agent. Each kind lives at exactly one hierarchy level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    /// Constitutional guardian (L0)
    Guardian,
    /// Cross-department coordinator (L1)
    Coordinator,
    /// Domain analyzer (L2)
    Analyzer,
    /// Operational executor (L3)
    Executor,
    /// Output validator (L2)
    Validator,
}

impl AgentType {
    /// The level every agent of this type is registered at.
    pub fn level(&self) -> AgentLevel {
        match self {
            AgentType::Guardian => AgentLevel::L0,
            AgentType::Coordinator => AgentLevel::L1,
            AgentType::Analyzer | AgentType::Validator => AgentLevel::L2,
            AgentType::Executor => AgentLevel::L3,
        }
    }

    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            AgentType::Guardian => "guardian",
            AgentType::Coordinator => "coordinator",
            AgentType::Analyzer => "analyzer",
            AgentType::Executor => "executor",
            AgentType::Validator => "validator",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, EnumParseError> {
        match normalize(s).as_str() {
            "guardian" => Ok(AgentType::Guardian),
            "coordinator" => Ok(AgentType::Coordinator),
            "analyzer" | "analyser" => Ok(AgentType::Analyzer),
            "executor" => Ok(AgentType::Executor),
            "validator" => Ok(AgentType::Validator),
            _ => Err(EnumParseError {
                kind: "agent type",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for AgentType {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

// ============================================================================
// MESSAGING
// ============================================================================

/// Type of agent message. Always derived from the payload variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Work handed to an agent
    TaskAssignment,
    /// Progress report
    StatusUpdate,
    /// Issue raised up the hierarchy
    Escalation,
    /// Request for a human or superior sign-off
    ApprovalRequest,
    /// Notice that a task was vetoed
    VetoNotice,
    /// Free-form coordination signal
    Coordination,
}

impl MessageType {
    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            MessageType::TaskAssignment => "task_assignment",
            MessageType::StatusUpdate => "status_update",
            MessageType::Escalation => "escalation",
            MessageType::ApprovalRequest => "approval_request",
            MessageType::VetoNotice => "veto_notice",
            MessageType::Coordination => "coordination",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, EnumParseError> {
        match normalize(s).as_str() {
            "taskassignment" => Ok(MessageType::TaskAssignment),
            "statusupdate" => Ok(MessageType::StatusUpdate),
            "escalation" => Ok(MessageType::Escalation),
            "approvalrequest" => Ok(MessageType::ApprovalRequest),
            "vetonotice" | "veto" => Ok(MessageType::VetoNotice),
            "coordination" => Ok(MessageType::Coordination),
            _ => Err(EnumParseError {
                kind: "message type",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for MessageType {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Priority level for messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum MessagePriority {
    /// Low priority - can be delayed
    Low,
    /// Normal priority
    #[default]
    Normal,
    /// High priority - should be processed soon
    High,
    /// Critical - must be processed immediately
    Critical,
}

impl MessagePriority {
    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            MessagePriority::Low => "low",
            MessagePriority::Normal => "normal",
            MessagePriority::High => "high",
            MessagePriority::Critical => "critical",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, EnumParseError> {
        match normalize(s).as_str() {
            "low" => Ok(MessagePriority::Low),
            "normal" | "medium" => Ok(MessagePriority::Normal),
            "high" => Ok(MessagePriority::High),
            "critical" | "urgent" => Ok(MessagePriority::Critical),
            _ => Err(EnumParseError {
                kind: "message priority",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for MessagePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for MessagePriority {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

// ============================================================================
// TASK STATE
// ============================================================================

/// Execution state of a coordinated task.
///
/// ```text
/// create() → Pending ── first step ──→ Running ──┬── complete() → Completed
///               │                         │      └── fail()     → Failed
///               └──────── veto() ─────────┴─────────────────────→ Vetoed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Created, no reasoning recorded yet
    Pending,
    /// At least one reasoning step recorded
    Running,
    /// Finished with an output
    Completed,
    /// Rejected by an L0 agent
    Vetoed,
    /// Abandoned with a recorded reason
    Failed,
}

impl TaskState {
    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::Completed => "completed",
            TaskState::Vetoed => "vetoed",
            TaskState::Failed => "failed",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, EnumParseError> {
        match normalize(s).as_str() {
            "pending" => Ok(TaskState::Pending),
            "running" | "inprogress" => Ok(TaskState::Running),
            "completed" | "complete" => Ok(TaskState::Completed),
            "vetoed" => Ok(TaskState::Vetoed),
            "failed" | "failure" => Ok(TaskState::Failed),
            _ => Err(EnumParseError {
                kind: "task state",
                value: s.to_string(),
            }),
        }
    }

    /// Check if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Vetoed | TaskState::Failed
        )
    }

    /// Check if the task still counts as active work.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Structural transition table, before any governance policy is applied.
    ///
    /// `Pending → Completed/Failed` is listed here because configuration may
    /// allow zero-step completion; the default policy rejects it.
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        use TaskState::{Completed, Failed, Pending, Running, Vetoed};
        matches!(
            (self, next),
            (Pending, Running)
                | (Pending, Vetoed)
                | (Pending, Completed)
                | (Pending, Failed)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Vetoed)
        )
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for TaskState {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_agent_type() -> impl Strategy<Value = AgentType> {
        prop_oneof![
            Just(AgentType::Guardian),
            Just(AgentType::Coordinator),
            Just(AgentType::Analyzer),
            Just(AgentType::Executor),
            Just(AgentType::Validator),
        ]
    }

    fn arb_message_type() -> impl Strategy<Value = MessageType> {
        prop_oneof![
            Just(MessageType::TaskAssignment),
            Just(MessageType::StatusUpdate),
            Just(MessageType::Escalation),
            Just(MessageType::ApprovalRequest),
            Just(MessageType::VetoNotice),
            Just(MessageType::Coordination),
        ]
    }

    fn arb_priority() -> impl Strategy<Value = MessagePriority> {
        prop_oneof![
            Just(MessagePriority::Low),
            Just(MessagePriority::Normal),
            Just(MessagePriority::High),
            Just(MessagePriority::Critical),
        ]
    }

    fn arb_task_state() -> impl Strategy<Value = TaskState> {
        prop_oneof![
            Just(TaskState::Pending),
            Just(TaskState::Running),
            Just(TaskState::Completed),
            Just(TaskState::Vetoed),
            Just(TaskState::Failed),
        ]
    }

    proptest! {
        /// Every db string parses back to the value that produced it.
        #[test]
        fn prop_db_str_roundtrip(
            agent_type in arb_agent_type(),
            message_type in arb_message_type(),
            priority in arb_priority(),
            state in arb_task_state(),
        ) {
            prop_assert_eq!(AgentType::from_db_str(agent_type.as_db_str()), Ok(agent_type));
            prop_assert_eq!(MessageType::from_db_str(message_type.as_db_str()), Ok(message_type));
            prop_assert_eq!(MessagePriority::from_db_str(priority.as_db_str()), Ok(priority));
            prop_assert_eq!(TaskState::from_db_str(state.as_db_str()), Ok(state));
        }

        #[test]
        fn prop_level_u8_roundtrip(level in prop::sample::select(AgentLevel::ALL.to_vec())) {
            prop_assert_eq!(AgentLevel::from_u8(level.as_u8()), Some(level));
        }

        /// Terminal states have no outgoing transitions.
        #[test]
        fn prop_terminal_states_are_final(from in arb_task_state(), to in arb_task_state()) {
            if from.is_terminal() {
                prop_assert!(!from.can_transition_to(to));
            }
        }
    }
}

//! Orchestrator: the single entry point that owns every store.
//!
//! Registry, message bus and coordinator sit behind one `RwLock`. A command
//! holds the write lock for its whole check-and-apply section, so racing
//! commands on one task serialize and the loser observes the winner's effect.
//! Queries share the read lock and see a consistent snapshot.

use crate::bus::{MessageBus, SendMessage};
use crate::coordinator::TaskCoordinator;
use crate::filter::{AgentFilter, TaskFilter};
use crate::registry::AgentRegistry;
use chrono::Utc;
use hierarch_core::{
    Agent, AgentId, AgentLevel, AgentSpec, ApprovalEvidence, HierarchConfig, HierarchError,
    HierarchResult, Message, MessageId, ResourceUsage, StorageError, Task, TaskId, TaskInput,
    TaskOutput, Timestamp,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug)]
struct State {
    registry: AgentRegistry,
    bus: MessageBus,
    coordinator: TaskCoordinator,
}

/// Thread-safe facade over the agent hierarchy.
#[derive(Debug)]
pub struct Orchestrator {
    config: HierarchConfig,
    state: RwLock<State>,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::build(HierarchConfig::default())
    }
}

impl Orchestrator {
    /// Create an orchestrator after validating `config`.
    pub fn new(config: HierarchConfig) -> HierarchResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    /// Create an orchestrator configured from `HIERARCH_*` environment variables.
    pub fn from_env() -> HierarchResult<Self> {
        Self::new(HierarchConfig::from_env())
    }

    fn build(config: HierarchConfig) -> Self {
        let state = State {
            registry: AgentRegistry::new(),
            bus: MessageBus::new(),
            coordinator: TaskCoordinator::new(&config),
        };
        Self {
            config,
            state: RwLock::new(state),
        }
    }

    pub fn config(&self) -> &HierarchConfig {
        &self.config
    }

    fn read(&self) -> HierarchResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| StorageError::LockPoisoned.into())
    }

    fn write(&self) -> HierarchResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| StorageError::LockPoisoned.into())
    }

    // === Commands ===

    pub fn register_agent(&self, spec: AgentSpec) -> HierarchResult<Agent> {
        let mut state = self.write()?;
        logged("register_agent", state.registry.register(spec))
    }

    pub fn toggle_agent(&self, agent_id: AgentId) -> HierarchResult<Agent> {
        let mut state = self.write()?;
        logged("toggle_agent", state.registry.toggle_active(agent_id))
    }

    pub fn send_message(&self, request: SendMessage) -> HierarchResult<Message> {
        let mut guard = self.write()?;
        let state = &mut *guard;
        logged("send_message", state.bus.send(&state.registry, request))
    }

    pub fn acknowledge_message(&self, message_id: MessageId) -> HierarchResult<Message> {
        let mut state = self.write()?;
        logged("acknowledge_message", state.bus.acknowledge(message_id))
    }

    pub fn create_task(
        &self,
        agent_id: AgentId,
        input: TaskInput,
        human_approval_required: bool,
    ) -> HierarchResult<Task> {
        let mut guard = self.write()?;
        let State {
            registry,
            coordinator,
            ..
        } = &mut *guard;
        let result = registry
            .get(agent_id)
            .and_then(|owner| coordinator.create(owner, input, human_approval_required));
        logged("create_task", result)
    }

    pub fn add_reasoning_step(
        &self,
        task_id: TaskId,
        action: impl Into<String>,
        detail: impl Into<String>,
    ) -> HierarchResult<Task> {
        let mut state = self.write()?;
        logged(
            "add_reasoning_step",
            state.coordinator.add_reasoning_step(task_id, action, detail),
        )
    }

    pub fn complete_task(
        &self,
        task_id: TaskId,
        output: TaskOutput,
        approval: Option<ApprovalEvidence>,
    ) -> HierarchResult<Task> {
        let mut state = self.write()?;
        logged(
            "complete_task",
            state.coordinator.complete(task_id, output, approval),
        )
    }

    pub fn fail_task(&self, task_id: TaskId, reason: impl Into<String>) -> HierarchResult<Task> {
        let mut state = self.write()?;
        logged("fail_task", state.coordinator.fail(task_id, reason))
    }

    /// Veto on behalf of `agent_id`. The agent is resolved first, so an
    /// unknown agent is NotFound regardless of the task.
    pub fn veto_task(&self, task_id: TaskId, agent_id: AgentId) -> HierarchResult<Task> {
        let mut guard = self.write()?;
        let State {
            registry,
            coordinator,
            ..
        } = &mut *guard;
        let result = registry
            .get(agent_id)
            .and_then(|agent| coordinator.veto(task_id, agent));
        logged("veto_task", result)
    }

    pub fn record_usage(&self, task_id: TaskId, usage: ResourceUsage) -> HierarchResult<Task> {
        let mut state = self.write()?;
        logged("record_usage", state.coordinator.record_usage(task_id, usage))
    }

    // === Queries ===

    pub fn get_agent(&self, agent_id: AgentId) -> HierarchResult<Agent> {
        self.read()?.registry.get(agent_id).cloned()
    }

    pub fn filter_agents(&self, filter: &AgentFilter) -> HierarchResult<Vec<Agent>> {
        let state = self.read()?;
        Ok(filter
            .apply(state.registry.iter())
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn counts_by_level(&self) -> HierarchResult<BTreeMap<AgentLevel, usize>> {
        Ok(self.read()?.registry.counts_by_level())
    }

    pub fn direct_reports(&self, agent_id: AgentId) -> HierarchResult<Vec<Agent>> {
        let state = self.read()?;
        let reports = state.registry.direct_reports(agent_id)?;
        Ok(reports.into_iter().cloned().collect())
    }

    pub fn get_task(&self, task_id: TaskId) -> HierarchResult<Task> {
        self.read()?.coordinator.get(task_id).cloned()
    }

    pub fn active_tasks(&self) -> HierarchResult<Vec<Task>> {
        let state = self.read()?;
        Ok(state.coordinator.active_tasks().into_iter().cloned().collect())
    }

    pub fn filter_tasks(&self, filter: &TaskFilter) -> HierarchResult<Vec<Task>> {
        let state = self.read()?;
        Ok(filter
            .apply(state.coordinator.iter())
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn stale_tasks(&self, now: Timestamp) -> HierarchResult<Vec<Task>> {
        let state = self.read()?;
        Ok(state.coordinator.stale_tasks(now).into_iter().cloned().collect())
    }

    pub fn unacknowledged_messages(&self, recipient: Option<AgentId>) -> HierarchResult<Vec<Message>> {
        let state = self.read()?;
        Ok(state.bus.unacknowledged(recipient).into_iter().cloned().collect())
    }

    pub fn inbox(&self, recipient: AgentId) -> HierarchResult<Vec<Message>> {
        let state = self.read()?;
        Ok(state.bus.inbox(recipient).into_iter().cloned().collect())
    }

    pub fn conversation(&self, from: AgentId, to: AgentId) -> HierarchResult<Vec<Message>> {
        let state = self.read()?;
        Ok(state.bus.conversation(from, to).into_iter().cloned().collect())
    }

    // === Dispatch ===

    /// Run a marshalled command.
    pub fn execute(&self, command: Command) -> HierarchResult<CommandResult> {
        match command {
            Command::RegisterAgent(spec) => self.register_agent(spec).map(CommandResult::Agent),
            Command::ToggleAgent { agent_id } => {
                self.toggle_agent(agent_id).map(CommandResult::Agent)
            }
            Command::SendMessage(request) => {
                self.send_message(request).map(CommandResult::Message)
            }
            Command::AcknowledgeMessage { message_id } => self
                .acknowledge_message(message_id)
                .map(CommandResult::Message),
            Command::CreateTask {
                agent_id,
                input,
                human_approval_required,
            } => self
                .create_task(agent_id, input, human_approval_required)
                .map(CommandResult::Task),
            Command::AddReasoningStep {
                task_id,
                action,
                detail,
            } => self
                .add_reasoning_step(task_id, action, detail)
                .map(CommandResult::Task),
            Command::CompleteTask {
                task_id,
                output,
                approval,
            } => self
                .complete_task(task_id, output, approval)
                .map(CommandResult::Task),
            Command::FailTask { task_id, reason } => {
                self.fail_task(task_id, reason).map(CommandResult::Task)
            }
            Command::VetoTask { task_id, agent_id } => {
                self.veto_task(task_id, agent_id).map(CommandResult::Task)
            }
            Command::RecordUsage { task_id, usage } => {
                self.record_usage(task_id, usage).map(CommandResult::Task)
            }
        }
    }

    /// Run a marshalled query.
    pub fn query(&self, query: Query) -> HierarchResult<QueryResult> {
        match query {
            Query::GetAgent { agent_id } => self.get_agent(agent_id).map(QueryResult::Agent),
            Query::FilterAgents(filter) => self.filter_agents(&filter).map(QueryResult::Agents),
            Query::CountsByLevel => self.counts_by_level().map(QueryResult::Counts),
            Query::DirectReports { agent_id } => {
                self.direct_reports(agent_id).map(QueryResult::Agents)
            }
            Query::GetTask { task_id } => self.get_task(task_id).map(QueryResult::Task),
            Query::ActiveTasks => self.active_tasks().map(QueryResult::Tasks),
            Query::FilterTasks(filter) => self.filter_tasks(&filter).map(QueryResult::Tasks),
            Query::StaleTasks { now } => self
                .stale_tasks(now.unwrap_or_else(Utc::now))
                .map(QueryResult::Tasks),
            Query::UnacknowledgedMessages { recipient } => self
                .unacknowledged_messages(recipient)
                .map(QueryResult::Messages),
            Query::Inbox { agent_id } => self.inbox(agent_id).map(QueryResult::Messages),
            Query::Conversation { from, to } => {
                self.conversation(from, to).map(QueryResult::Messages)
            }
        }
    }
}

fn logged<T>(command: &'static str, result: HierarchResult<T>) -> HierarchResult<T> {
    if let Err(err) = &result {
        match err {
            HierarchError::Unauthorized(_) => {
                tracing::warn!(command, error = %err, "Command rejected")
            }
            _ => tracing::debug!(command, error = %err, "Command rejected"),
        }
    }
    result
}

/// State-changing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    RegisterAgent(AgentSpec),
    ToggleAgent {
        agent_id: AgentId,
    },
    SendMessage(SendMessage),
    AcknowledgeMessage {
        message_id: MessageId,
    },
    CreateTask {
        agent_id: AgentId,
        input: TaskInput,
        #[serde(default)]
        human_approval_required: bool,
    },
    AddReasoningStep {
        task_id: TaskId,
        action: String,
        #[serde(default)]
        detail: String,
    },
    CompleteTask {
        task_id: TaskId,
        output: TaskOutput,
        #[serde(default)]
        approval: Option<ApprovalEvidence>,
    },
    FailTask {
        task_id: TaskId,
        reason: String,
    },
    VetoTask {
        task_id: TaskId,
        agent_id: AgentId,
    },
    RecordUsage {
        task_id: TaskId,
        usage: ResourceUsage,
    },
}

/// The entity a command produced or updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CommandResult {
    Agent(Agent),
    Message(Message),
    Task(Task),
}

impl CommandResult {
    pub fn into_agent(self) -> Option<Agent> {
        match self {
            CommandResult::Agent(agent) => Some(agent),
            _ => None,
        }
    }

    pub fn into_message(self) -> Option<Message> {
        match self {
            CommandResult::Message(message) => Some(message),
            _ => None,
        }
    }

    pub fn into_task(self) -> Option<Task> {
        match self {
            CommandResult::Task(task) => Some(task),
            _ => None,
        }
    }
}

/// Read-only request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "query", rename_all = "snake_case")]
pub enum Query {
    GetAgent {
        agent_id: AgentId,
    },
    FilterAgents(AgentFilter),
    CountsByLevel,
    DirectReports {
        agent_id: AgentId,
    },
    GetTask {
        task_id: TaskId,
    },
    ActiveTasks,
    FilterTasks(TaskFilter),
    /// Defaults `now` to the current time
    StaleTasks {
        #[serde(default)]
        now: Option<Timestamp>,
    },
    UnacknowledgedMessages {
        #[serde(default)]
        recipient: Option<AgentId>,
    },
    Inbox {
        agent_id: AgentId,
    },
    Conversation {
        from: AgentId,
        to: AgentId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum QueryResult {
    Agent(Agent),
    Agents(Vec<Agent>),
    Counts(BTreeMap<AgentLevel, usize>),
    Task(Task),
    Tasks(Vec<Task>),
    Messages(Vec<Message>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use hierarch_core::{AgentType, ConfigError, EntityIdType, TaskState};
    use std::time::Duration;

    #[test]
    fn test_new_validates_config() {
        let config = HierarchConfig::default().with_stale_after(Duration::ZERO);
        let err = Orchestrator::new(config).unwrap_err();
        assert!(matches!(
            err,
            HierarchError::Config(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_create_task_for_unknown_agent() {
        let orchestrator = Orchestrator::default();
        let err = orchestrator
            .create_task(AgentId::now_v7(), TaskInput::action("x"), false)
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(orchestrator.active_tasks().unwrap().is_empty());
    }

    #[test]
    fn test_veto_by_unknown_agent() {
        let orchestrator = Orchestrator::default();
        let exec = orchestrator
            .register_agent(AgentSpec::of_type("E", AgentType::Executor, "ops"))
            .unwrap();
        let task = orchestrator
            .create_task(exec.agent_id, TaskInput::action("x"), false)
            .unwrap();
        let err = orchestrator
            .veto_task(task.task_id, AgentId::now_v7())
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(orchestrator.get_task(task.task_id).unwrap(), task);
    }

    #[test]
    fn test_execute_and_query_dispatch() {
        let orchestrator = Orchestrator::default();
        let guardian = orchestrator
            .execute(Command::RegisterAgent(AgentSpec::of_type(
                "G",
                AgentType::Guardian,
                "constitution",
            )))
            .unwrap()
            .into_agent()
            .unwrap();
        let task = orchestrator
            .execute(Command::CreateTask {
                agent_id: guardian.agent_id,
                input: TaskInput::action("audit"),
                human_approval_required: false,
            })
            .unwrap()
            .into_task()
            .unwrap();
        let vetoed = orchestrator
            .execute(Command::VetoTask {
                task_id: task.task_id,
                agent_id: guardian.agent_id,
            })
            .unwrap()
            .into_task()
            .unwrap();
        assert_eq!(vetoed.state, TaskState::Vetoed);

        match orchestrator.query(Query::CountsByLevel).unwrap() {
            QueryResult::Counts(counts) => {
                assert_eq!(counts.len(), 4);
                assert_eq!(counts[&AgentLevel::L0], 1);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(
            orchestrator.query(Query::ActiveTasks).unwrap(),
            QueryResult::Tasks(Vec::new())
        );
    }

    #[test]
    fn test_command_json_shape() {
        let task_id = TaskId::now_v7();
        let json = format!(
            r#"{{"command":"add_reasoning_step","task_id":"{}","action":"inspect"}}"#,
            task_id
        );
        let command: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(
            command,
            Command::AddReasoningStep {
                task_id,
                action: "inspect".to_string(),
                detail: String::new(),
            }
        );

        let query: Query = serde_json::from_str(r#"{"query":"filter_agents","level":"L2"}"#).unwrap();
        assert_eq!(query, Query::FilterAgents(AgentFilter::new().level(AgentLevel::L2)));
    }
}

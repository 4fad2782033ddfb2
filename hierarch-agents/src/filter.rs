//! Query filters over agent and task snapshots.

use hierarch_core::{Agent, AgentId, AgentLevel, AgentType, Task, TaskState};
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// Agent query. Unset fields match everything; only active agents are
/// returned unless `active_only` is cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AgentFilter {
    #[serde(default)]
    pub level: Option<AgentLevel>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub agent_type: Option<AgentType>,
    /// Required capability
    #[serde(default)]
    pub capability: Option<String>,
    #[serde(default = "default_true")]
    pub active_only: bool,
}

impl Default for AgentFilter {
    fn default() -> Self {
        Self {
            level: None,
            department: None,
            agent_type: None,
            capability: None,
            active_only: true,
        }
    }
}

impl AgentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: AgentLevel) -> Self {
        self.level = Some(level);
        self
    }

    pub fn department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn agent_type(mut self, agent_type: AgentType) -> Self {
        self.agent_type = Some(agent_type);
        self
    }

    pub fn capability(mut self, capability: impl Into<String>) -> Self {
        self.capability = Some(capability.into());
        self
    }

    /// Include inactive agents as well.
    pub fn include_inactive(mut self) -> Self {
        self.active_only = false;
        self
    }

    pub fn matches(&self, agent: &Agent) -> bool {
        (!self.active_only || agent.active)
            && self.level.map_or(true, |level| agent.level == level)
            && self
                .department
                .as_deref()
                .map_or(true, |dept| agent.department == dept)
            && self.agent_type.map_or(true, |t| agent.agent_type == t)
            && self
                .capability
                .as_deref()
                .map_or(true, |cap| agent.has_capability(cap))
    }

    /// Matching agents, preserving the order of `agents`.
    pub fn apply<'a, I>(&self, agents: I) -> Vec<&'a Agent>
    where
        I: IntoIterator<Item = &'a Agent>,
    {
        agents.into_iter().filter(|a| self.matches(a)).collect()
    }
}

/// Task query. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TaskFilter {
    #[serde(default)]
    pub state: Option<TaskState>,
    /// Owning agent
    #[serde(default)]
    pub agent_id: Option<AgentId>,
    /// Only pending and running tasks
    #[serde(default)]
    pub active_only: bool,
}

impl TaskFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(mut self, state: TaskState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn agent(mut self, agent_id: AgentId) -> Self {
        self.agent_id = Some(agent_id);
        self
    }

    pub fn active_only(mut self) -> Self {
        self.active_only = true;
        self
    }

    pub fn matches(&self, task: &Task) -> bool {
        (!self.active_only || task.state.is_active())
            && self.state.map_or(true, |state| task.state == state)
            && self.agent_id.map_or(true, |id| task.agent_id == id)
    }

    pub fn apply<'a, I>(&self, tasks: I) -> Vec<&'a Task>
    where
        I: IntoIterator<Item = &'a Task>,
    {
        tasks.into_iter().filter(|t| self.matches(t)).collect()
    }
}

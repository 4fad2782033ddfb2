//! Agent registry: the one authoritative table of agents.

use hierarch_core::{
    Agent, AgentId, AgentLevel, AgentSpec, EntityType, HierarchResult, NotFoundError,
    ValidationError,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Registered agents, kept in creation order. Agents are never removed;
/// deactivation is the only form of retirement.
#[derive(Debug, Default, Clone)]
pub struct AgentRegistry {
    agents: HashMap<AgentId, Agent>,
    order: Vec<AgentId>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new agent.
    ///
    /// A supervisor, when given, must exist and must outrank the new agent.
    pub fn register(&mut self, spec: AgentSpec) -> HierarchResult<Agent> {
        spec.validate()?;

        let supervised_by = match spec.reports_to {
            Some(supervisor_id) => {
                let supervisor = self.get(supervisor_id)?;
                if !supervisor.level.outranks(spec.level) {
                    return Err(ValidationError::InvalidHierarchy {
                        supervisor: supervisor_id,
                        supervisor_level: supervisor.level,
                        level: spec.level,
                    }
                    .into());
                }
                let mut chain = supervisor.supervised_by.clone();
                chain.insert(supervisor_id);
                chain
            }
            None => BTreeSet::new(),
        };

        let agent = Agent::from_spec(spec, supervised_by);
        tracing::info!(
            agent_id = %agent.agent_id,
            name = %agent.name,
            agent_type = %agent.agent_type,
            level = %agent.level,
            department = %agent.department,
            "Agent registered"
        );
        self.order.push(agent.agent_id);
        self.agents.insert(agent.agent_id, agent.clone());
        Ok(agent)
    }

    /// Flip an agent between active and inactive.
    pub fn toggle_active(&mut self, agent_id: AgentId) -> HierarchResult<Agent> {
        let agent = self
            .agents
            .get_mut(&agent_id)
            .ok_or_else(|| NotFoundError::new(EntityType::Agent, agent_id))?;
        agent.active = !agent.active;
        tracing::info!(agent_id = %agent_id, active = agent.active, "Agent toggled");
        Ok(agent.clone())
    }

    /// Look up an agent.
    pub fn get(&self, agent_id: AgentId) -> HierarchResult<&Agent> {
        self.agents
            .get(&agent_id)
            .ok_or_else(|| NotFoundError::new(EntityType::Agent, agent_id).into())
    }

    pub fn contains(&self, agent_id: AgentId) -> bool {
        self.agents.contains_key(&agent_id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// All agents in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Agent> + '_ {
        self.order.iter().filter_map(move |id| self.agents.get(id))
    }

    /// Active agents per level, computed from the current table on every call.
    /// Every level is present, with zero when it has no active agents.
    pub fn counts_by_level(&self) -> BTreeMap<AgentLevel, usize> {
        let mut counts: BTreeMap<AgentLevel, usize> =
            AgentLevel::ALL.iter().map(|level| (*level, 0)).collect();
        for agent in self.agents.values().filter(|a| a.active) {
            *counts.entry(agent.level).or_insert(0) += 1;
        }
        counts
    }

    /// Agents whose direct supervisor is `agent_id`, in creation order.
    pub fn direct_reports(&self, agent_id: AgentId) -> HierarchResult<Vec<&Agent>> {
        self.get(agent_id)?;
        Ok(self
            .iter()
            .filter(|a| a.reports_to == Some(agent_id))
            .collect())
    }
}

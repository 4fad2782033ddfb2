//! Agent identity and registration types.

use crate::{AgentId, AgentLevel, AgentType, EntityIdType, Timestamp, ValidationError};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Registration request for a new agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AgentSpec {
    /// Display name
    pub name: String,
    /// Kind of agent
    pub agent_type: AgentType,
    /// Requested level; must equal `agent_type.level()`
    pub level: AgentLevel,
    /// Department the agent works for
    pub department: String,
    /// Area of responsibility inside the department
    #[serde(default)]
    pub sphere: Option<String>,
    /// Direct supervisor
    #[serde(default)]
    pub reports_to: Option<AgentId>,
    /// Capabilities this agent has
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(value_type = Vec<String>))]
    pub capabilities: BTreeSet<String>,
    /// Constraints this agent must operate under
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(value_type = Vec<String>))]
    pub constraints: BTreeSet<String>,
}

impl AgentSpec {
    /// Start a registration request.
    pub fn new(
        name: impl Into<String>,
        agent_type: AgentType,
        level: AgentLevel,
        department: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            agent_type,
            level,
            department: department.into(),
            sphere: None,
            reports_to: None,
            capabilities: BTreeSet::new(),
            constraints: BTreeSet::new(),
        }
    }

    /// Start a registration request at the level the type requires.
    pub fn of_type(
        name: impl Into<String>,
        agent_type: AgentType,
        department: impl Into<String>,
    ) -> Self {
        Self::new(name, agent_type, agent_type.level(), department)
    }

    /// Set supervisor.
    pub fn with_supervisor(mut self, supervisor_id: AgentId) -> Self {
        self.reports_to = Some(supervisor_id);
        self
    }

    /// Set sphere.
    pub fn with_sphere(mut self, sphere: impl Into<String>) -> Self {
        self.sphere = Some(sphere.into());
        self
    }

    /// Set capabilities.
    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    /// Set constraints.
    pub fn with_constraints<I, S>(mut self, constraints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constraints = constraints.into_iter().map(Into::into).collect();
        self
    }

    /// Check the request in isolation (no registry lookups).
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "name".to_string(),
            });
        }
        if self.department.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "department".to_string(),
            });
        }
        let expected = self.agent_type.level();
        if self.level != expected {
            return Err(ValidationError::LevelMismatch {
                agent_type: self.agent_type,
                expected,
                got: self.level,
            });
        }
        if self.capabilities.iter().any(|c| c.trim().is_empty()) {
            return Err(ValidationError::InvalidValue {
                field: "capabilities".to_string(),
                reason: "capability names must not be blank".to_string(),
            });
        }
        Ok(())
    }
}

/// An agent in the hierarchy.
///
/// `reports_to` and `supervised_by` are id back-references into the registry;
/// an agent never owns another agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Agent {
    /// Unique identifier for this agent
    pub agent_id: AgentId,
    /// Display name
    pub name: String,
    /// Kind of agent
    pub agent_type: AgentType,
    /// Hierarchy level, fixed at registration
    pub level: AgentLevel,
    /// Department the agent works for
    pub department: String,
    /// Area of responsibility inside the department
    pub sphere: Option<String>,
    /// Capabilities this agent has
    #[cfg_attr(feature = "openapi", schema(value_type = Vec<String>))]
    pub capabilities: BTreeSet<String>,
    /// Constraints this agent must operate under
    #[cfg_attr(feature = "openapi", schema(value_type = Vec<String>))]
    pub constraints: BTreeSet<String>,
    /// Direct supervisor
    pub reports_to: Option<AgentId>,
    /// Full supervisor chain above this agent
    #[cfg_attr(feature = "openapi", schema(value_type = Vec<String>))]
    pub supervised_by: BTreeSet<AgentId>,
    /// Whether the agent currently takes part in coordination
    pub active: bool,
    /// When this agent was registered
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
}

impl Agent {
    /// Build an active agent from a validated spec.
    pub fn from_spec(spec: AgentSpec, supervised_by: BTreeSet<AgentId>) -> Self {
        Self {
            agent_id: AgentId::now_v7(),
            name: spec.name,
            agent_type: spec.agent_type,
            level: spec.level,
            department: spec.department,
            sphere: spec.sphere,
            capabilities: spec.capabilities,
            constraints: spec.constraints,
            reports_to: spec.reports_to,
            supervised_by,
            active: true,
            created_at: Utc::now(),
        }
    }

    /// Check if agent has a specific capability.
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    /// Whether this agent holds constitutional (veto) authority right now.
    pub fn holds_veto_authority(&self) -> bool {
        self.level == AgentLevel::L0 && self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_level_mismatch_rejected() {
        let spec = AgentSpec::new("Guardian-1", AgentType::Guardian, AgentLevel::L2, "core");
        assert_eq!(
            spec.validate(),
            Err(ValidationError::LevelMismatch {
                agent_type: AgentType::Guardian,
                expected: AgentLevel::L0,
                got: AgentLevel::L2,
            })
        );
    }

    #[test]
    fn test_spec_non_guardian_at_level_zero_rejected() {
        let spec = AgentSpec::new("Exec", AgentType::Executor, AgentLevel::L0, "ops");
        assert!(matches!(
            spec.validate(),
            Err(ValidationError::LevelMismatch { .. })
        ));
    }

    #[test]
    fn test_spec_blank_name_rejected() {
        let spec = AgentSpec::of_type("  ", AgentType::Analyzer, "construction");
        assert_eq!(
            spec.validate(),
            Err(ValidationError::RequiredFieldMissing {
                field: "name".to_string()
            })
        );
    }

    #[test]
    fn test_agent_from_spec() {
        let spec = AgentSpec::of_type("Analyzer-1", AgentType::Analyzer, "construction")
            .with_sphere("structural")
            .with_capabilities(["load-analysis", "materials"])
            .with_constraints(["read-only"]);
        let agent = Agent::from_spec(spec, BTreeSet::new());

        assert_eq!(agent.level, AgentLevel::L2);
        assert!(agent.active);
        assert!(agent.has_capability("materials"));
        assert!(!agent.has_capability("welding"));
        assert_eq!(agent.sphere.as_deref(), Some("structural"));
        assert!(!agent.holds_veto_authority());
    }

    #[test]
    fn test_guardian_holds_veto_only_while_active() {
        let spec = AgentSpec::of_type("Guardian-1", AgentType::Guardian, "constitution");
        let mut agent = Agent::from_spec(spec, BTreeSet::new());
        assert!(agent.holds_veto_authority());
        agent.active = false;
        assert!(!agent.holds_veto_authority());
    }
}

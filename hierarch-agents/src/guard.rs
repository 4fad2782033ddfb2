//! Governance guard: agents assist, they never decide unilaterally.
//!
//! The guard holds policy only. It is consulted by the task coordinator before
//! every state-changing call and never mutates a task itself.

use hierarch_core::{
    Agent, ApprovalEvidence, GovernanceError, HierarchConfig, HierarchResult, StateError, Task,
    TaskState, Timestamp, ValidationError,
};

/// Stateless rule set derived from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GovernanceGuard {
    allow_zero_step_completion: bool,
    record_rejected_vetoes: bool,
    max_reasoning_steps: usize,
}

impl Default for GovernanceGuard {
    fn default() -> Self {
        Self::from_config(&HierarchConfig::default())
    }
}

impl GovernanceGuard {
    pub fn from_config(config: &HierarchConfig) -> Self {
        Self {
            allow_zero_step_completion: config.allow_zero_step_completion,
            record_rejected_vetoes: config.record_rejected_vetoes,
            // Step numbers are u32; an unvalidated config cannot push past them.
            max_reasoning_steps: config.max_reasoning_steps.min(u32::MAX as usize),
        }
    }

    /// Whether rejected veto attempts go into the task's violations log.
    pub fn records_rejected_vetoes(&self) -> bool {
        self.record_rejected_vetoes
    }

    /// Bookkeeping such as usage accounting is allowed until the task ends.
    pub fn check_open(&self, task: &Task, operation: &str) -> Result<(), StateError> {
        if task.state.is_terminal() {
            return Err(invalid(task, operation));
        }
        Ok(())
    }

    /// A reasoning step may be appended while the task is pending or running
    /// and below the step cap.
    pub fn check_step(&self, task: &Task) -> HierarchResult<()> {
        self.check_open(task, "add a reasoning step to")?;
        if task.reasoning_trace.len() >= self.max_reasoning_steps {
            return Err(ValidationError::InvalidValue {
                field: "reasoning_trace".to_string(),
                reason: format!(
                    "task {} reached the limit of {} steps",
                    task.task_id, self.max_reasoning_steps
                ),
            }
            .into());
        }
        Ok(())
    }

    /// `complete` and `fail` require a running task, or a pending one when
    /// zero-step completion is enabled.
    pub fn check_finish(&self, task: &Task, target: TaskState) -> Result<(), StateError> {
        let operation = match target {
            TaskState::Completed => "complete",
            TaskState::Failed => "fail",
            _ => "finish",
        };
        let allowed = match task.state {
            TaskState::Running => task.state.can_transition_to(target),
            TaskState::Pending => {
                self.allow_zero_step_completion && task.state.can_transition_to(target)
            }
            _ => false,
        };
        if allowed {
            Ok(())
        } else {
            Err(invalid(task, operation))
        }
    }

    /// Completion of an approval-gated task needs evidence given before `now`
    /// and after the task was created.
    pub fn check_approval(
        &self,
        task: &Task,
        approval: Option<&ApprovalEvidence>,
        now: Timestamp,
    ) -> Result<(), GovernanceError> {
        if !task.human_approval_required {
            return Ok(());
        }
        let evidence = approval.ok_or(GovernanceError::ApprovalRequired {
            task_id: task.task_id,
        })?;
        let reason = if evidence.approver.trim().is_empty() {
            Some("approver is blank".to_string())
        } else if evidence.approved_at > now {
            Some("approval is dated in the future".to_string())
        } else if evidence.approved_at < task.created_at {
            Some("approval predates the task".to_string())
        } else {
            None
        };
        match reason {
            Some(reason) => Err(GovernanceError::InvalidApproval {
                task_id: task.task_id,
                reason,
            }),
            None => Ok(()),
        }
    }

    /// Veto requires a non-terminal task and an active L0 agent. State is
    /// checked first so that terminal tasks always report the transition error.
    pub fn check_veto(&self, task: &Task, agent: &Agent) -> HierarchResult<()> {
        if !task.state.can_transition_to(TaskState::Vetoed) {
            return Err(invalid(task, "veto").into());
        }
        if !agent.holds_veto_authority() {
            let reason = if agent.active {
                "only L0 agents hold veto authority"
            } else {
                "agent is inactive"
            };
            return Err(GovernanceError::VetoNotPermitted {
                agent_id: agent.agent_id,
                level: agent.level,
                reason: reason.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

fn invalid(task: &Task, operation: &str) -> StateError {
    StateError {
        task_id: task.task_id,
        from: task.state,
        operation: operation.to_string(),
    }
}

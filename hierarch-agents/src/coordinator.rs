//! Task coordination: per-task state machine with an append-only trace.
//!
//! ```text
//! create() → Pending ── add_reasoning_step() ──→ Running ──┬── complete() → Completed
//!               │                                   │      └── fail()     → Failed
//!               └─────────────── veto() ────────────┴──────────────────→ Vetoed
//! ```
//!
//! Tasks live only inside the coordinator; callers receive clones. Once a task
//! is terminal no command touches it again, audit entries included.

use crate::guard::GovernanceGuard;
use chrono::Utc;
use hierarch_core::{
    Agent, ApprovalEvidence, EntityType, HierarchConfig, HierarchResult, NotFoundError,
    ResourceUsage, Task, TaskId, TaskInput, TaskOutput, TaskState, Timestamp,
    ValidationError, VETO_VIOLATION,
};
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct TaskCoordinator {
    guard: GovernanceGuard,
    stale_after: Duration,
    tasks: HashMap<TaskId, Task>,
    order: Vec<TaskId>,
    /// Pending and running task ids. TaskIds are UUIDv7, so this iterates in
    /// creation order.
    active: BTreeSet<TaskId>,
}

impl Default for TaskCoordinator {
    fn default() -> Self {
        Self::new(&HierarchConfig::default())
    }
}

impl TaskCoordinator {
    pub fn new(config: &HierarchConfig) -> Self {
        Self {
            guard: GovernanceGuard::from_config(config),
            stale_after: config.stale_after,
            tasks: HashMap::new(),
            order: Vec::new(),
            active: BTreeSet::new(),
        }
    }

    pub fn guard(&self) -> &GovernanceGuard {
        &self.guard
    }

    /// Create a pending task owned by `owner`.
    pub fn create(
        &mut self,
        owner: &Agent,
        input: TaskInput,
        human_approval_required: bool,
    ) -> HierarchResult<Task> {
        input.validate()?;
        if !owner.active {
            return Err(ValidationError::InvalidValue {
                field: "agent_id".to_string(),
                reason: format!("agent {} is inactive", owner.agent_id),
            }
            .into());
        }

        let task = Task::new(owner.agent_id, input, human_approval_required);
        tracing::info!(
            task_id = %task.task_id,
            agent_id = %owner.agent_id,
            human_approval_required,
            "Task created"
        );
        self.order.push(task.task_id);
        self.active.insert(task.task_id);
        self.tasks.insert(task.task_id, task.clone());
        Ok(task)
    }

    /// Append a reasoning step. The first step moves the task to running.
    pub fn add_reasoning_step(
        &mut self,
        task_id: TaskId,
        action: impl Into<String>,
        detail: impl Into<String>,
    ) -> HierarchResult<Task> {
        let action = action.into();
        let detail = detail.into();
        let task = self
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| NotFoundError::new(EntityType::Task, task_id))?;

        self.guard.check_step(task)?;
        if action.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "action".to_string(),
            }
            .into());
        }

        let from = task.state;
        task.push_step(action, detail, Utc::now());
        tracing::debug!(
            task_id = %task_id,
            step = task.reasoning_trace.len(),
            from = %from,
            state = %task.state,
            "Reasoning step added"
        );
        Ok(task.clone())
    }

    /// Complete a running task. Approval-gated tasks need evidence.
    pub fn complete(
        &mut self,
        task_id: TaskId,
        output: TaskOutput,
        approval: Option<ApprovalEvidence>,
    ) -> HierarchResult<Task> {
        let now = Utc::now();
        let task = self
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| NotFoundError::new(EntityType::Task, task_id))?;

        self.guard.check_finish(task, TaskState::Completed)?;
        if let Err(err) = self.guard.check_approval(task, approval.as_ref(), now) {
            tracing::warn!(task_id = %task_id, error = %err, "Completion rejected");
            return Err(err.into());
        }

        task.output = Some(output);
        task.approval = approval;
        task.finish(TaskState::Completed, now);
        self.active.remove(&task_id);
        tracing::info!(task_id = %task_id, "Task completed");
        Ok(task.clone())
    }

    /// Fail a running task, recording the reason in its violations.
    pub fn fail(&mut self, task_id: TaskId, reason: impl Into<String>) -> HierarchResult<Task> {
        let reason = reason.into();
        let task = self
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| NotFoundError::new(EntityType::Task, task_id))?;

        self.guard.check_finish(task, TaskState::Failed)?;
        if reason.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "reason".to_string(),
            }
            .into());
        }

        task.record_violation(reason.clone());
        task.finish(TaskState::Failed, Utc::now());
        self.active.remove(&task_id);
        tracing::info!(task_id = %task_id, reason = %reason, "Task failed");
        Ok(task.clone())
    }

    /// Veto a pending or running task on behalf of `by`.
    ///
    /// An unauthorized attempt leaves the state untouched; when configured it
    /// is written to the violations log of the (non-terminal) task.
    pub fn veto(&mut self, task_id: TaskId, by: &Agent) -> HierarchResult<Task> {
        let task = self
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| NotFoundError::new(EntityType::Task, task_id))?;

        if let Err(err) = self.guard.check_veto(task, by) {
            if err.is_unauthorized() {
                tracing::warn!(
                    task_id = %task_id,
                    agent_id = %by.agent_id,
                    level = %by.level,
                    "Veto rejected"
                );
                if self.guard.records_rejected_vetoes() {
                    task.record_violation(format!(
                        "REJECTED VETO by {} ({}, {})",
                        by.name, by.agent_id, by.level
                    ));
                }
            }
            return Err(err);
        }

        task.record_violation(VETO_VIOLATION);
        task.finish(TaskState::Vetoed, Utc::now());
        self.active.remove(&task_id);
        tracing::info!(task_id = %task_id, agent_id = %by.agent_id, "Task vetoed");
        Ok(task.clone())
    }

    /// Add to the task's resource counters.
    pub fn record_usage(&mut self, task_id: TaskId, usage: ResourceUsage) -> HierarchResult<Task> {
        let task = self
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| NotFoundError::new(EntityType::Task, task_id))?;
        self.guard.check_open(task, "record usage for")?;
        task.resources_used.accumulate(usage);
        tracing::debug!(
            task_id = %task_id,
            tokens = task.resources_used.tokens,
            api_calls = task.resources_used.api_calls,
            elapsed_ms = task.resources_used.elapsed_ms,
            "Usage recorded"
        );
        Ok(task.clone())
    }

    pub fn get(&self, task_id: TaskId) -> HierarchResult<&Task> {
        self.tasks
            .get(&task_id)
            .ok_or_else(|| NotFoundError::new(EntityType::Task, task_id).into())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// All tasks in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Task> + '_ {
        self.order.iter().filter_map(move |id| self.tasks.get(id))
    }

    /// Pending and running tasks, read from the maintained index.
    pub fn active_tasks(&self) -> Vec<&Task> {
        self.active
            .iter()
            .filter_map(|id| self.tasks.get(id))
            .collect()
    }

    /// Active tasks without activity for longer than the staleness threshold.
    /// Report only: nothing is transitioned.
    pub fn stale_tasks(&self, now: Timestamp) -> Vec<&Task> {
        let Ok(threshold) = chrono::Duration::from_std(self.stale_after) else {
            return Vec::new();
        };
        self.active_tasks()
            .into_iter()
            .filter(|task| now.signed_duration_since(task.last_activity()) > threshold)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hierarch_core::{AgentSpec, AgentType, EntityIdType, GovernanceError, HierarchError};

    fn agent(agent_type: AgentType) -> Agent {
        Agent::from_spec(AgentSpec::of_type("a", agent_type, "d"), BTreeSet::new())
    }

    fn coordinator_with_running_task() -> (TaskCoordinator, Agent, TaskId) {
        let mut coordinator = TaskCoordinator::default();
        let exec = agent(AgentType::Executor);
        let task = coordinator
            .create(&exec, TaskInput::action("x"), false)
            .unwrap();
        coordinator
            .add_reasoning_step(task.task_id, "plan", "first step")
            .unwrap();
        (coordinator, exec, task.task_id)
    }

    #[test]
    fn test_create_pending() {
        let mut coordinator = TaskCoordinator::default();
        let exec = agent(AgentType::Executor);
        let task = coordinator
            .create(&exec, TaskInput::action("x"), false)
            .unwrap();
        assert_eq!(task.state, TaskState::Pending);
        assert_eq!(task.agent_id, exec.agent_id);
        assert_eq!(coordinator.active_tasks().len(), 1);
    }

    #[test]
    fn test_create_for_inactive_owner_rejected() {
        let mut coordinator = TaskCoordinator::default();
        let mut exec = agent(AgentType::Executor);
        exec.active = false;
        let err = coordinator
            .create(&exec, TaskInput::action("x"), false)
            .unwrap_err();
        assert!(err.is_validation());
        assert!(coordinator.is_empty());
    }

    #[test]
    fn test_steps_are_numbered_from_one() {
        let (mut coordinator, _, task_id) = coordinator_with_running_task();
        coordinator.add_reasoning_step(task_id, "act", "").unwrap();
        let task = coordinator.add_reasoning_step(task_id, "check", "").unwrap();

        assert_eq!(task.state, TaskState::Running);
        let steps: Vec<u32> = task.reasoning_trace.iter().map(|s| s.step).collect();
        assert_eq!(steps, vec![1, 2, 3]);
        assert!(task.started_at.is_some());
    }

    #[test]
    fn test_blank_step_action_rejected() {
        let (mut coordinator, _, task_id) = coordinator_with_running_task();
        let err = coordinator.add_reasoning_step(task_id, " ", "").unwrap_err();
        assert!(err.is_validation());
        assert_eq!(coordinator.get(task_id).unwrap().reasoning_trace.len(), 1);
    }

    #[test]
    fn test_complete_from_pending_rejected() {
        let mut coordinator = TaskCoordinator::default();
        let task = coordinator
            .create(&agent(AgentType::Executor), TaskInput::action("x"), false)
            .unwrap();
        let err = coordinator
            .complete(task.task_id, TaskOutput::new("done"), None)
            .unwrap_err();
        assert!(err.is_invalid_transition());
        assert_eq!(coordinator.get(task.task_id).unwrap(), &task);
    }

    #[test]
    fn test_complete_sets_output() {
        let (mut coordinator, _, task_id) = coordinator_with_running_task();
        let task = coordinator
            .complete(task_id, TaskOutput::new("done"), None)
            .unwrap();
        assert_eq!(task.state, TaskState::Completed);
        assert_eq!(task.output, Some(TaskOutput::new("done")));
        assert!(task.ended_at.is_some());
        assert!(coordinator.active_tasks().is_empty());
    }

    #[test]
    fn test_complete_gated_task_needs_approval() {
        let mut coordinator = TaskCoordinator::default();
        let task = coordinator
            .create(&agent(AgentType::Executor), TaskInput::action("x"), true)
            .unwrap();
        coordinator.add_reasoning_step(task.task_id, "plan", "").unwrap();

        let err = coordinator
            .complete(task.task_id, TaskOutput::new("done"), None)
            .unwrap_err();
        assert!(matches!(
            err,
            HierarchError::Unauthorized(GovernanceError::ApprovalRequired { .. })
        ));
        assert_eq!(coordinator.get(task.task_id).unwrap().state, TaskState::Running);

        let approval = ApprovalEvidence::now("site-manager");
        let done = coordinator
            .complete(task.task_id, TaskOutput::new("done"), Some(approval.clone()))
            .unwrap();
        assert_eq!(done.state, TaskState::Completed);
        assert_eq!(done.approval, Some(approval));
    }

    #[test]
    fn test_fail_records_reason() {
        let (mut coordinator, _, task_id) = coordinator_with_running_task();
        let task = coordinator.fail(task_id, "supplier unavailable").unwrap();
        assert_eq!(task.state, TaskState::Failed);
        assert_eq!(task.violations, vec!["supplier unavailable".to_string()]);
        assert!(task.output.is_none());
    }

    #[test]
    fn test_veto_from_pending() {
        let mut coordinator = TaskCoordinator::default();
        let task = coordinator
            .create(&agent(AgentType::Executor), TaskInput::action("x"), false)
            .unwrap();
        let vetoed = coordinator
            .veto(task.task_id, &agent(AgentType::Guardian))
            .unwrap();
        assert_eq!(vetoed.state, TaskState::Vetoed);
        assert_eq!(vetoed.violations, vec![VETO_VIOLATION.to_string()]);
        assert!(coordinator.active_tasks().is_empty());
    }

    #[test]
    fn test_rejected_veto_is_audited_without_state_change() {
        let (mut coordinator, _, task_id) = coordinator_with_running_task();
        let err = coordinator
            .veto(task_id, &agent(AgentType::Analyzer))
            .unwrap_err();
        assert!(err.is_unauthorized());

        let task = coordinator.get(task_id).unwrap();
        assert_eq!(task.state, TaskState::Running);
        assert_eq!(task.violations.len(), 1);
        assert!(task.violations[0].starts_with("REJECTED VETO"));
        assert!(task.ended_at.is_none());
    }

    #[test]
    fn test_rejected_veto_not_audited_when_disabled() {
        let config = HierarchConfig::default().with_rejected_veto_recording(false);
        let mut coordinator = TaskCoordinator::new(&config);
        let task = coordinator
            .create(&agent(AgentType::Executor), TaskInput::action("x"), false)
            .unwrap();
        assert!(coordinator
            .veto(task.task_id, &agent(AgentType::Executor))
            .is_err());
        assert_eq!(coordinator.get(task.task_id).unwrap(), &task);
    }

    #[test]
    fn test_terminal_task_is_frozen() {
        let (mut coordinator, _, task_id) = coordinator_with_running_task();
        coordinator.veto(task_id, &agent(AgentType::Guardian)).unwrap();
        let frozen = coordinator.get(task_id).unwrap().clone();

        assert!(coordinator
            .add_reasoning_step(task_id, "more", "")
            .unwrap_err()
            .is_invalid_transition());
        assert!(coordinator
            .complete(task_id, TaskOutput::new("done"), None)
            .unwrap_err()
            .is_invalid_transition());
        assert!(coordinator.fail(task_id, "late").unwrap_err().is_invalid_transition());
        assert!(coordinator
            .veto(task_id, &agent(AgentType::Guardian))
            .unwrap_err()
            .is_invalid_transition());
        assert!(coordinator
            .veto(task_id, &agent(AgentType::Executor))
            .unwrap_err()
            .is_invalid_transition());
        assert!(coordinator
            .record_usage(task_id, ResourceUsage::default())
            .unwrap_err()
            .is_invalid_transition());

        assert_eq!(coordinator.get(task_id).unwrap(), &frozen);
    }

    #[test]
    fn test_unknown_task() {
        let mut coordinator = TaskCoordinator::default();
        assert!(coordinator
            .add_reasoning_step(TaskId::now_v7(), "x", "")
            .unwrap_err()
            .is_not_found());
        assert!(coordinator.get(TaskId::now_v7()).unwrap_err().is_not_found());
    }

    #[test]
    fn test_record_usage_accumulates() {
        let (mut coordinator, _, task_id) = coordinator_with_running_task();
        let usage = ResourceUsage {
            tokens: 120,
            api_calls: 2,
            elapsed_ms: 40,
        };
        coordinator.record_usage(task_id, usage).unwrap();
        let task = coordinator.record_usage(task_id, usage).unwrap();
        assert_eq!(task.resources_used.tokens, 240);
        assert_eq!(task.resources_used.api_calls, 4);
    }

    #[test]
    fn test_stale_tasks_report_only() {
        let config = HierarchConfig::default().with_stale_after(Duration::from_secs(60));
        let mut coordinator = TaskCoordinator::new(&config);
        let task = coordinator
            .create(&agent(AgentType::Executor), TaskInput::action("x"), false)
            .unwrap();

        let now = Utc::now();
        assert!(coordinator.stale_tasks(now).is_empty());

        let later = now + chrono::Duration::seconds(120);
        let stale = coordinator.stale_tasks(later);
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].task_id, task.task_id);
        assert_eq!(stale[0].state, TaskState::Pending);
    }

    #[test]
    fn test_active_index_in_creation_order() {
        let mut coordinator = TaskCoordinator::default();
        let exec = agent(AgentType::Executor);
        let ids: Vec<TaskId> = (0..4)
            .map(|i| {
                coordinator
                    .create(&exec, TaskInput::action(format!("a{}", i)), false)
                    .unwrap()
                    .task_id
            })
            .collect();
        coordinator.veto(ids[1], &agent(AgentType::Guardian)).unwrap();

        let active: Vec<TaskId> = coordinator.active_tasks().iter().map(|t| t.task_id).collect();
        assert_eq!(active, vec![ids[0], ids[2], ids[3]]);
    }
}

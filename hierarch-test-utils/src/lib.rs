//! HIERARCH Test Utilities
//!
//! Shared test infrastructure for the HIERARCH workspace:
//! - Proptest generators for agent specs and task inputs
//! - A fixture that registers a standard hierarchy
//! - Custom assertions over `HierarchResult`
//! - A tracing bootstrap for tests

pub use hierarch_agents::{AgentFilter, Orchestrator, SendMessage, TaskFilter};
pub use hierarch_core::{
    Agent, AgentId, AgentLevel, AgentSpec, AgentType, EntityIdType, HierarchConfig,
    HierarchError, HierarchResult, Task, TaskId, TaskInput, TaskState,
};

use tracing_subscriber::EnvFilter;

/// Install a formatting subscriber for tests.
///
/// Honors `RUST_LOG`, defaulting to `hierarch_agents=debug`; set
/// `HIERARCH_LOG_JSON` for JSON lines. Safe to call from every test, only the
/// first call installs anything.
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("hierarch_agents=debug"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer();
    let _ = if std::env::var_os("HIERARCH_LOG_JSON").is_some() {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for HIERARCH entity types.

    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    /// Random agent id (not necessarily registered).
    pub fn arb_agent_id() -> impl Strategy<Value = AgentId> {
        any::<[u8; 16]>().prop_map(|bytes| AgentId::new(Uuid::from_bytes(bytes)))
    }

    pub fn arb_agent_type() -> impl Strategy<Value = AgentType> {
        prop_oneof![
            Just(AgentType::Guardian),
            Just(AgentType::Coordinator),
            Just(AgentType::Analyzer),
            Just(AgentType::Executor),
            Just(AgentType::Validator),
        ]
    }

    pub fn arb_level() -> impl Strategy<Value = AgentLevel> {
        prop::sample::select(AgentLevel::ALL.to_vec())
    }

    pub fn arb_department() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("construction".to_string()),
            Just("finance".to_string()),
            Just("safety".to_string()),
            Just("logistics".to_string()),
        ]
    }

    /// A registration request that passes validation when it has no supervisor.
    pub fn arb_agent_spec() -> impl Strategy<Value = AgentSpec> {
        (
            "[A-Z][a-z]{2,8}-[0-9]{1,3}",
            arb_agent_type(),
            arb_department(),
            prop::collection::btree_set("[a-z]{3,10}", 0..4),
        )
            .prop_map(|(name, agent_type, department, capabilities)| {
                AgentSpec::of_type(name, agent_type, department).with_capabilities(capabilities)
            })
    }

    pub fn arb_task_input() -> impl Strategy<Value = TaskInput> {
        prop_oneof![
            (
                "[a-z]{3,12}",
                prop::collection::btree_map("[a-z]{2,6}", "[a-z0-9]{1,8}", 0..3)
            )
                .prop_map(|(action, parameters): (String, BTreeMap<String, String>)| {
                    TaskInput::Action { action, parameters }
                }),
            ("[a-z]{3,12}", "[a-z ]{5,30}").prop_map(|(subject, question)| {
                TaskInput::Analysis { subject, question }
            }),
            ("[a-z]{3,12}", prop::collection::vec("[a-z]{3,10}", 0..3))
                .prop_map(|(target, criteria)| TaskInput::Review { target, criteria }),
        ]
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! A registered five-agent hierarchy.

    use super::*;

    /// Orchestrator with one agent of every type:
    ///
    /// ```text
    /// guardian (L0, constitution)
    /// └── coordinator (L1, construction)
    ///     ├── analyzer (L2, construction)
    ///     ├── validator (L2, construction)
    ///     └── executor (L3, construction)
    /// ```
    #[derive(Debug)]
    pub struct Fixture {
        pub orchestrator: Orchestrator,
        pub guardian: Agent,
        pub coordinator: Agent,
        pub analyzer: Agent,
        pub validator: Agent,
        pub executor: Agent,
    }

    impl Fixture {
        pub fn new() -> Self {
            Self::with_config(HierarchConfig::default())
        }

        pub fn with_config(config: HierarchConfig) -> Self {
            let orchestrator = Orchestrator::new(config).expect("valid test config");
            let guardian = orchestrator
                .register_agent(AgentSpec::of_type(
                    "Guardian-1",
                    AgentType::Guardian,
                    "constitution",
                ))
                .expect("register guardian");
            let coordinator = orchestrator
                .register_agent(
                    AgentSpec::of_type("Coordinator-1", AgentType::Coordinator, "construction")
                        .with_supervisor(guardian.agent_id),
                )
                .expect("register coordinator");
            let under = |name: &str, agent_type: AgentType| {
                orchestrator
                    .register_agent(
                        AgentSpec::of_type(name, agent_type, "construction")
                            .with_supervisor(coordinator.agent_id),
                    )
                    .expect("register agent")
            };
            let analyzer = under("Analyzer-1", AgentType::Analyzer);
            let validator = under("Validator-1", AgentType::Validator);
            let executor = under("Executor-1", AgentType::Executor);

            Self {
                orchestrator,
                guardian,
                coordinator,
                analyzer,
                validator,
                executor,
            }
        }

        /// Create a task owned by the executor and move it to running.
        pub fn running_task(&self, human_approval_required: bool) -> Task {
            let task = self
                .orchestrator
                .create_task(
                    self.executor.agent_id,
                    TaskInput::action("pour-foundation"),
                    human_approval_required,
                )
                .expect("create task");
            self.orchestrator
                .add_reasoning_step(task.task_id, "plan", "check site readiness")
                .expect("first step")
        }
    }

    impl Default for Fixture {
        fn default() -> Self {
            Self::new()
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over `HierarchResult` variants.

    use super::*;

    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &HierarchResult<T>) {
        match result {
            Err(HierarchError::NotFound(_)) => {}
            other => panic!("Expected NotFound error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_unauthorized<T: std::fmt::Debug>(result: &HierarchResult<T>) {
        match result {
            Err(HierarchError::Unauthorized(_)) => {}
            other => panic!("Expected Unauthorized error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_invalid_transition<T: std::fmt::Debug>(result: &HierarchResult<T>) {
        match result {
            Err(HierarchError::InvalidTransition(_)) => {}
            other => panic!("Expected InvalidTransition error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_validation<T: std::fmt::Debug>(result: &HierarchResult<T>) {
        match result {
            Err(HierarchError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    /// Assert the trace is numbered 1..=n without gaps.
    #[track_caller]
    pub fn assert_trace_numbered(task: &Task) {
        for (i, step) in task.reasoning_trace.iter().enumerate() {
            assert_eq!(step.step as usize, i + 1, "gap in trace of {}", task.task_id);
        }
    }
}

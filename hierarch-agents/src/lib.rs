//! HIERARCH Agents - Hierarchical Agent Coordination
//!
//! Coordination primitives for a four-level agent hierarchy:
//! - Agent registration and activation (`AgentRegistry`)
//! - Typed messages with acknowledgment tracking (`MessageBus`)
//! - Task lifecycle with an append-only reasoning trace (`TaskCoordinator`)
//! - Veto authority and human-approval gating (`GovernanceGuard`)
//! - Snapshot queries (`AgentFilter`, `TaskFilter`)
//!
//! `Orchestrator` owns all stores behind a single lock and is the type most
//! callers want.

mod bus;
mod coordinator;
mod filter;
mod guard;
mod orchestrator;
mod registry;

pub use bus::{MessageBus, SendMessage};
pub use coordinator::TaskCoordinator;
pub use filter::{AgentFilter, TaskFilter};
pub use guard::GovernanceGuard;
pub use orchestrator::{Command, CommandResult, Orchestrator, Query, QueryResult};
pub use registry::AgentRegistry;

//! Racing commands against one orchestrator from several threads.

use hierarch_agents::SendMessage;
use hierarch_core::{MessagePayload, TaskOutput, TaskState};
use hierarch_test_utils::assertions::assert_trace_numbered;
use hierarch_test_utils::fixtures::Fixture;
use hierarch_test_utils::init_test_tracing;
use std::thread;

#[test]
fn test_complete_races_with_steps() {
    init_test_tracing();
    let fixture = Fixture::new();

    for _ in 0..20 {
        let task = fixture.running_task(false);
        let orchestrator = &fixture.orchestrator;

        let (completed, steps) = thread::scope(|scope| {
            let completer = scope.spawn(|| {
                orchestrator.complete_task(task.task_id, TaskOutput::new("done"), None)
            });
            let stepper = scope.spawn(|| {
                (0..10)
                    .map(|i| orchestrator.add_reasoning_step(task.task_id, "work", format!("{}", i)))
                    .collect::<Vec<_>>()
            });
            (
                completer.join().expect("completer thread"),
                stepper.join().expect("stepper thread"),
            )
        });

        let completed = completed.expect("completion of a running task");
        let final_task = orchestrator.get_task(task.task_id).unwrap();
        assert_eq!(final_task.state, TaskState::Completed);
        assert_eq!(final_task, completed);
        assert_trace_numbered(&final_task);

        // Steps either landed before completion or lost with a transition error;
        // once one loses, every later one does too.
        let accepted = steps.iter().take_while(|r| r.is_ok()).count();
        assert!(steps[accepted..]
            .iter()
            .all(|r| r.as_ref().err().is_some_and(|e| e.is_invalid_transition())));
        assert_eq!(final_task.reasoning_trace.len(), 1 + accepted);
    }
}

#[test]
fn test_only_one_terminal_command_wins() {
    init_test_tracing();
    let fixture = Fixture::new();
    let task = fixture.running_task(false);
    let orchestrator = &fixture.orchestrator;
    let guardian = fixture.guardian.agent_id;

    let results = thread::scope(|scope| {
        let handles = vec![
            scope.spawn(|| orchestrator.veto_task(task.task_id, guardian)),
            scope.spawn(|| orchestrator.fail_task(task.task_id, "timeout")),
            scope.spawn(|| {
                orchestrator.complete_task(task.task_id, TaskOutput::new("done"), None)
            }),
            scope.spawn(|| orchestrator.veto_task(task.task_id, guardian)),
        ];
        handles
            .into_iter()
            .map(|h| h.join().expect("worker thread"))
            .collect::<Vec<_>>()
    });

    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    assert!(results
        .iter()
        .filter(|r| r.is_err())
        .all(|r| r.as_ref().err().is_some_and(|e| e.is_invalid_transition())));
    assert_eq!(&orchestrator.get_task(task.task_id).unwrap(), winners[0]);
}

#[test]
fn test_concurrent_sends_keep_pair_order() {
    init_test_tracing();
    let fixture = Fixture::new();
    let orchestrator = &fixture.orchestrator;
    let executor = fixture.executor.agent_id;
    let analyzer = fixture.analyzer.agent_id;
    let coordinator = fixture.coordinator.agent_id;

    thread::scope(|scope| {
        for from in [executor, analyzer] {
            scope.spawn(move || {
                for i in 0..25 {
                    orchestrator
                        .send_message(SendMessage::new(
                            from,
                            coordinator,
                            MessagePayload::StatusUpdate {
                                task_id: None,
                                status: format!("{}", i),
                            },
                        ))
                        .expect("send");
                }
            });
        }
    });

    for from in [executor, analyzer] {
        let statuses: Vec<String> = orchestrator
            .conversation(from, coordinator)
            .unwrap()
            .into_iter()
            .map(|m| match m.payload {
                MessagePayload::StatusUpdate { status, .. } => status,
                other => panic!("unexpected payload: {:?}", other),
            })
            .collect();
        let expected: Vec<String> = (0..25).map(|i| format!("{}", i)).collect();
        assert_eq!(statuses, expected);
    }
    assert_eq!(orchestrator.inbox(coordinator).unwrap().len(), 50);
}

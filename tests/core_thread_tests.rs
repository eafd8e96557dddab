//! Core Thread Integration Tests
//!
//! Tests for:
//! - Command batching and execution order
//! - Blocking and non-blocking submission
//! - Panic isolation
//! - Shutdown

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use render_task_core::config::CoreThreadConfig;
use render_task_core::engine_state::core_thread::{CommandDispatch, CoreThread};
use render_task_core::errors::RenderCoreError;

fn spawn_core_thread() -> CoreThread {
    CoreThread::spawn(&CoreThreadConfig {
        name: "test core".to_string(),
        stack_size: None,
    })
    .unwrap()
}

// ============================================================================
// Submission
// ============================================================================

#[test]
fn queued_commands_wait_for_submit() {
    let core_thread = spawn_core_thread();
    let ran = Arc::new(AtomicBool::new(false));
    let flag = ran.clone();

    core_thread.queue_command(Box::new(move || flag.store(true, Ordering::SeqCst)));
    assert_eq!(core_thread.pending_commands(), 1);
    assert!(!ran.load(Ordering::SeqCst));

    core_thread.submit_and_block().unwrap();
    assert!(ran.load(Ordering::SeqCst));
    assert_eq!(core_thread.pending_commands(), 0);
}

#[test]
fn batches_execute_in_submission_order() {
    let core_thread = spawn_core_thread();
    let order = Arc::new(Mutex::new(Vec::new()));

    for batch in 0..3 {
        for command in 0..3 {
            let order = order.clone();
            core_thread.queue_command(Box::new(move || {
                order.lock().unwrap().push((batch, command));
            }));
        }
        core_thread.submit(false).unwrap();
    }
    core_thread.submit_and_block().unwrap();

    let expected: Vec<_> = (0..3)
        .flat_map(|batch| (0..3).map(move |command| (batch, command)))
        .collect();
    assert_eq!(*order.lock().unwrap(), expected);
}

#[test]
fn commands_run_on_the_core_thread() {
    let core_thread = Arc::new(spawn_core_thread());
    let observed = Arc::new(Mutex::new(None));

    let inner = core_thread.clone();
    let result = observed.clone();
    core_thread.queue_command(Box::new(move || {
        let name = std::thread::current().name().map(str::to_string);
        *result.lock().unwrap() = Some((inner.is_core_thread(), name));
    }));
    core_thread.submit_and_block().unwrap();

    assert!(!core_thread.is_core_thread());
    assert_eq!(
        *observed.lock().unwrap(),
        Some((true, Some("test core".to_string())))
    );
}

#[test]
fn submitting_from_the_core_thread_runs_inline() {
    let core_thread = Arc::new(spawn_core_thread());
    let nested_ran = Arc::new(AtomicBool::new(false));

    let inner = core_thread.clone();
    let flag = nested_ran.clone();
    core_thread.queue_command(Box::new(move || {
        let nested_flag = flag.clone();
        inner.queue_command(Box::new(move || nested_flag.store(true, Ordering::SeqCst)));
        inner.submit_and_block().unwrap();
        assert!(flag.load(Ordering::SeqCst));
    }));

    core_thread.submit_and_block().unwrap();
    assert!(nested_ran.load(Ordering::SeqCst));
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn panicking_command_is_reported_and_thread_survives() {
    let core_thread = spawn_core_thread();
    let after_panic = Arc::new(AtomicBool::new(false));
    let flag = after_panic.clone();

    core_thread.queue_command(Box::new(|| panic!("shader compilation failed")));
    core_thread.queue_command(Box::new(move || flag.store(true, Ordering::SeqCst)));

    let error = core_thread.submit_and_block().unwrap_err();
    match error {
        RenderCoreError::CommandPanicked(message) => {
            assert!(message.contains("shader compilation failed"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(after_panic.load(Ordering::SeqCst));

    // Later batches still run.
    core_thread.submit_and_block().unwrap();
}

#[test]
fn shutdown_runs_outstanding_commands() {
    let core_thread = spawn_core_thread();
    let ran = Arc::new(AtomicBool::new(false));
    let flag = ran.clone();

    core_thread.queue_command(Box::new(move || flag.store(true, Ordering::SeqCst)));
    core_thread.shutdown().unwrap();

    assert!(ran.load(Ordering::SeqCst));
    assert!(!core_thread.is_running());
}

#[test]
fn submitting_after_shutdown_fails() {
    let core_thread = spawn_core_thread();
    core_thread.shutdown().unwrap();
    core_thread.shutdown().unwrap();

    core_thread.queue_command(Box::new(|| {}));
    assert!(matches!(
        core_thread.submit_and_block(),
        Err(RenderCoreError::CoreThreadStopped)
    ));
    assert!(matches!(
        core_thread.submit(false),
        Err(RenderCoreError::CoreThreadStopped)
    ));
}

//! Engine Integration Tests
//!
//! Tests for:
//! - Frame-by-frame task progress on the core thread
//! - Completion callbacks on the issuing thread
//! - View rendering through registered extensions
//! - Shutdown draining

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use render_task_core::config::{EngineConfig, TaskConfig};
use render_task_core::core::MtResource;
use render_task_core::engine_state::core_thread::CommandDispatch;
use render_task_core::engine_state::rendering::debug_overlay::DebugOverlay;
use render_task_core::engine_state::rendering::tasks::StreamingUpload;
use render_task_core::engine_state::task_management::task::RendererTask;
use render_task_core::engine_state::Engine;

/// Blocks until every frame submitted so far has executed on the core thread.
fn sync_frames(engine: &Engine) {
    engine.core_thread().submit_and_block().unwrap();
}

#[test]
fn streaming_upload_progresses_one_slice_per_frame() {
    let mut engine = Engine::new(EngineConfig::default()).unwrap();
    let destination = MtResource::new(Vec::new());
    let upload = StreamingUpload::create_task("upload", vec![7; 40], 10, destination.clone());
    engine.add_task(&upload).unwrap();

    engine.frame().unwrap();
    engine.frame().unwrap();
    sync_frames(&engine);
    assert_eq!(destination.get().len(), 20);
    assert!(!upload.is_complete());

    engine.frame().unwrap();
    engine.frame().unwrap();
    sync_frames(&engine);
    assert!(upload.is_complete());
    assert_eq!(*destination.get(), vec![7; 40]);
    assert_eq!(engine.frame_index(), 4);

    engine.shutdown().unwrap();
}

#[test]
fn completion_callbacks_fire_on_the_following_frame() {
    let mut engine = Engine::new(EngineConfig::default()).unwrap();
    let notified = Arc::new(AtomicUsize::new(0));
    let task = RendererTask::create("one shot", || true);
    let counter = notified.clone();
    task.on_complete(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    engine.add_task(&task).unwrap();

    engine.frame().unwrap();
    sync_frames(&engine);
    assert!(task.is_complete());
    assert_eq!(notified.load(Ordering::SeqCst), 0);

    engine.frame().unwrap();
    assert_eq!(notified.load(Ordering::SeqCst), 1);

    engine.shutdown().unwrap();
}

#[test]
fn every_view_is_rendered_each_frame() {
    let mut engine = Engine::new(EngineConfig::default()).unwrap();
    let overlay = Arc::new(DebugOverlay::new());
    engine.register_extension(overlay.clone());

    let left = engine.core_objects().create("left eye");
    let right = engine.core_objects().create("right eye");
    engine.add_view(left);
    engine.add_view(right);
    engine.add_view(right);

    engine.frame().unwrap();
    engine.frame().unwrap();
    sync_frames(&engine);
    assert_eq!(overlay.views_rendered(), 4);
    assert_eq!(overlay.last_frame(), 1);

    engine.remove_view(left);
    engine.frame().unwrap();
    sync_frames(&engine);
    assert_eq!(overlay.views_rendered(), 5);

    engine.shutdown().unwrap();
}

#[test]
fn frame_publishes_core_objects() {
    let mut engine = Engine::new(EngineConfig::default()).unwrap();
    let light = engine.core_objects().create("sun");
    assert!(!engine.core_objects().is_core_initialized(light));

    engine.frame().unwrap();
    assert!(engine.core_objects().is_core_initialized(light));
    assert_eq!(engine.scene().publish_count(), 1);

    engine.shutdown().unwrap();
}

#[test]
fn shutdown_drains_pending_tasks() {
    let engine = Engine::new(EngineConfig::default()).unwrap();
    let mut steps = 0;
    let task = RendererTask::create("slow", move || {
        steps += 1;
        steps == 10
    });
    engine.add_task(&task).unwrap();

    engine.shutdown().unwrap();

    assert!(task.is_complete());
    assert!(!engine.core_thread().is_running());
    // A second shutdown has nothing left to do.
    engine.shutdown().unwrap();
}

#[test]
fn shutdown_without_draining_leaves_tasks_pending() {
    let config = EngineConfig {
        tasks: TaskConfig {
            drain_on_shutdown: false,
        },
        ..EngineConfig::default()
    };
    let engine = Engine::new(config).unwrap();
    let task = RendererTask::create("abandoned", || true);
    engine.add_task(&task).unwrap();

    engine.shutdown().unwrap();

    assert!(!task.is_complete());
    assert_eq!(engine.renderer().tasks().queued_count(), 1);
}

#[test]
fn wait_all_through_the_engine() {
    let engine = Engine::new(EngineConfig::default()).unwrap();
    let first = RendererTask::create("first", || true);
    let mut calls = 0;
    let second = RendererTask::create("second", move || {
        calls += 1;
        calls == 3
    });
    engine.add_task(&first).unwrap();
    engine.add_task(&second).unwrap();

    engine.wait_all().unwrap();
    assert!(first.is_complete());
    assert!(second.is_complete());
    assert!(engine.renderer().tasks().is_idle());

    engine.shutdown().unwrap();
}

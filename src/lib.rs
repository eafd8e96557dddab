#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Render Task Core
//!
//! Deferred-task execution and cross-thread synchronization for a real-time
//! renderer.
//!
//! Work issued on the simulation thread is executed on a dedicated core thread.
//! Tasks are resumable: their worker is invoked once per frame until it reports
//! completion, so long running GPU-adjacent operations (streaming uploads,
//! multi-frame readbacks) make incremental progress without blocking either
//! thread. Callers that need a result right away can force a single task to
//! completion through the synchronization bridge.
//!
//! ## Key Modules
//!
//! * `config` - Engine configuration loaded from JSON
//! * `core` - Shared-state primitives used across threads
//! * `engine_state` - The engine, core thread, renderer, scene state and task management
//! * `errors` - The crate error type
//!
//! ## Usage
//!
//! ```rust,no_run
//! // Native application initialization
//! fn main() {
//!     if let Err(error) = render_task_core::run() {
//!         log::error!("{}", error);
//!     }
//! }
//! ```

use cgmath::Vector3;
use log::info;
use std::sync::Arc;

use config::EngineConfig;
use crate::core::MtResource;
use engine_state::rendering::debug_overlay::DebugOverlay;
use engine_state::rendering::tasks::{GpuReadback, StreamingUpload};
use engine_state::scene::Transform;
use engine_state::Engine;
use errors::Result;

pub mod config;
pub mod core;
pub mod engine_state;
pub mod errors;

/// Environment variable naming an optional JSON configuration file for `run()`.
pub const CONFIG_PATH_VAR: &str = "RENDER_TASK_CONFIG";

/// Frames simulated by the demo session in `run()`.
const DEMO_FRAMES: u64 = 4;

/// Initializes `env_logger` from `RUST_LOG`, writing to stdout.
///
/// Safe to call more than once; only the first call installs the logger.
pub fn init_logging() {
    let mut log_builder = env_logger::Builder::new();
    let installed = log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .try_init()
        .is_ok();

    if installed {
        info!("Logger initialized");
    }
}

/// Runs a short demo session: a streaming upload progresses over several frames
/// while a readback is forced to completion through the synchronization bridge.
pub fn run() -> Result<()> {
    init_logging();

    let config = match std::env::var(CONFIG_PATH_VAR) {
        Ok(path) => EngineConfig::load(path)?,
        Err(_) => EngineConfig::default(),
    };

    let mut engine = Engine::new(config)?;

    let camera = engine.core_objects().create("main camera");
    engine.scene().set_transform(
        camera,
        Transform::from_position(Vector3::new(0.0, 2.0, -10.0)),
    );
    engine.add_view(camera);

    let overlay = Arc::new(DebugOverlay::new());
    engine.register_extension(overlay.clone());

    let uploaded = MtResource::new(Vec::new());
    let upload = StreamingUpload::create_task(
        "terrain upload",
        vec![0xAB; 4096],
        1024,
        uploaded.clone(),
    );
    upload.on_complete(|task| info!("Task '{}' finished", task.name()));
    engine.add_task(&upload)?;

    let frame_buffer = MtResource::new(vec![0x10; 64]);
    let (readback, result) = GpuReadback::create_task("frame readback", frame_buffer, 3);
    engine.add_task(&readback)?;

    for _ in 0..DEMO_FRAMES {
        engine.frame()?;
    }

    readback.wait(engine.bridge())?;
    info!(
        "Readback delivered {} bytes",
        result.data().map_or(0, |data| data.len())
    );

    engine.shutdown()?;
    info!(
        "Uploaded {} bytes, overlay drew {} views",
        uploaded.get().len(),
        overlay.views_rendered()
    );
    Ok(())
}

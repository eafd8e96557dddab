//! # Render Task Core Entry Point
//!
//! Runs the demo session from the library's `run()` function.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=debug cargo run --release
//! ```

fn main() {
    if let Err(error) = render_task_core::run() {
        log::error!("{}", error);
        std::process::exit(1);
    }
}

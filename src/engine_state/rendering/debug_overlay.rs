//! Overlay extension that tracks how many views were drawn.

use std::sync::atomic::{AtomicU64, Ordering};

use super::extension::{RenderLocation, RenderView, RendererExtension};

/// Counts rendered views and logs the frame they belong to.
///
/// Registered by the demo session as a smoke test of the extension pipeline.
#[derive(Debug, Default)]
pub struct DebugOverlay {
    views_rendered: AtomicU64,
    last_frame: AtomicU64,
}

impl DebugOverlay {
    /// Creates an overlay with zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Views rendered so far.
    pub fn views_rendered(&self) -> u64 {
        self.views_rendered.load(Ordering::Acquire)
    }

    /// Frame index of the most recently rendered view.
    pub fn last_frame(&self) -> u64 {
        self.last_frame.load(Ordering::Acquire)
    }
}

impl RendererExtension for DebugOverlay {
    fn name(&self) -> &str {
        "debug overlay"
    }

    fn location(&self) -> RenderLocation {
        RenderLocation::Overlay
    }

    fn priority(&self) -> i32 {
        // Draw after every other overlay.
        i32::MIN
    }

    fn render(&self, view: &RenderView) {
        self.views_rendered.fetch_add(1, Ordering::AcqRel);
        self.last_frame.store(view.frame_index, Ordering::Release);
        log::trace!(
            "Debug overlay drawn for camera {:?} in frame {}",
            view.camera,
            view.frame_index
        );
    }
}

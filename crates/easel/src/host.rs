use tracing::event;

use crate::{TRACE_TARGET_GUEST, surface::Surface};

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Size of the host viewport in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// The host environment a bridge runs in.
///
/// The bridge owns the [`Surface`]; a host only reports how large the
/// viewport is and shows whatever the guest drew once a frame is done.
pub trait Host: 'static {
    /// Current size of the area the surface should fill.
    fn viewport(&self) -> Viewport;

    /// Show the surface after a tick completed.
    fn present(&mut self, surface: &Surface) -> core::result::Result<(), BoxError> {
        let _ = surface;
        Ok(())
    }

    /// Diagnostic sink for guest `log` calls.
    fn log(&mut self, message: &str) {
        event!(
            name: "log",
            target: TRACE_TARGET_GUEST,
            tracing::Level::INFO,
            log.output = message,
        );
    }
}

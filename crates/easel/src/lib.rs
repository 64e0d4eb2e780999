mod internal;

pub mod bridge;
pub mod capability;
pub mod error;
pub mod event;
pub mod host;
pub mod input;
pub mod surface;

pub const TRACE_TARGET_GUEST: &str = "easel::guest";

pub use bridge::{Bridge, BridgeBuilder, BridgeConfig, EntryPoint};
pub use error::{Error, Result};
pub use event::{EventSource, HostEvent, QueuedEvents, RefreshTimer};
pub use host::{BoxError, Host, Viewport};
pub use input::{KeyCode, PhysicalKey};
pub use surface::{Color, Surface};

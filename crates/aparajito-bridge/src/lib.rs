//! Native/UI playback bridge.
//!
//! A [`router::Bridge`] owns one playback session and one backend. The
//! [`runtime`] module runs it on a single tokio task so that UI commands,
//! backend notifications and timeline ticks never interleave.

pub mod backend;
pub mod error;
pub mod events;
pub mod layout;
pub mod locator;
pub mod picker;
pub mod router;
pub mod runtime;
pub mod session;
pub mod timeline;
pub mod tracks;

pub use backend::{BackendEvent, PlaybackBackend};
pub use error::BridgeError;
pub use events::EventBus;
pub use picker::{FilePicker, NoPicker};
pub use router::{Bridge, BridgeConfig, CommandOutcome};
pub use runtime::{spawn_bridge, BridgeHandle};

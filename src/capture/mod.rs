pub mod config;
pub mod controller;
pub mod format;
pub mod handle;
pub mod host;
pub mod recording;
pub mod result;
pub mod screenshot;
pub mod timer;
pub mod view;

#[cfg(feature = "desktop")]
pub mod bridge;
#[cfg(feature = "desktop")]
pub mod commands;

pub use controller::{
    CaptureController, CaptureDependencies, CapturePhase, CaptureState, ControlEvent, Notice,
    SessionId,
};
pub use handle::{spawn_controller, ControllerHandle};

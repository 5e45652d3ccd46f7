/// Event name constants for backend -> frontend communication
pub const STATE_CHANGED: &str = "capture:state-changed";
pub const CAPTURE_COMPLETED: &str = "capture:completed";
pub const CAPTURE_FAILED: &str = "capture:failed";
pub const SHORTCUT_TRIGGERED: &str = "shortcut:triggered";

/// Host bridge requests, answered by the webview through `host_*` commands
pub const HOST_REQUEST_SESSION: &str = "host:request-session";
pub const HOST_ENCODER: &str = "host:encoder";
pub const HOST_RENDER: &str = "host:render";

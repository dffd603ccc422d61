//! Process exit codes.

/// Clean exit: either nothing went wrong, or the peer connection ended
/// with the expected clean `Disconnected` stop.
pub const SUCCESS: i32 = 0;

/// Any other fatal error.
pub const ERROR: i32 = 1;

pub const SUCCESS: i32 = 0;
/// Unreadable input, malformed channels or invalid configuration
pub const INPUT_ERROR: i32 = 1;
pub const EXECUTION_ERROR: i32 = 2;
/// Some channels failed, the rest completed
pub const PARTIAL_FAILURE: i32 = 3;

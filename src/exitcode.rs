//! Standard exit codes (BSD sysexits.h compatible)

/// Successful termination
pub const OK: i32 = 0;

/// Tree is not valid (`validate` found violations)
pub const INVALID: i32 = 1;

/// Command line usage error
pub const USAGE: i32 = 64;

/// Data format error (rejected tree operation)
pub const DATAERR: i32 = 65;

/// Internal software error (invariant violation)
pub const SOFTWARE: i32 = 70;

/// Input/output error (store failure)
pub const IOERR: i32 = 74;

/// Configuration error
pub const CONFIG: i32 = 78;

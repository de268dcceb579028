//! Command implementations for `elv-token`.

pub mod keys;
pub mod token;

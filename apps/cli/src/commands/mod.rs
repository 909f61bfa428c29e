//! Command implementations for the gatetune CLI.

pub mod prepare;
pub mod run;
pub mod status;
pub mod types;
pub mod wait;

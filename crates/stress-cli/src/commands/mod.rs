//! Subcommand implementations.

pub mod fractions;
pub mod info;
pub mod partition;
pub mod run;

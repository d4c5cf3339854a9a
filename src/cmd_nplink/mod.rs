//! Subcommand modules for the `nplink` binary.

pub mod link;
pub mod null;

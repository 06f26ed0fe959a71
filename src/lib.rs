//! vtstore library - backend-agnostic access to video-analysis metadata
//!
//! Provides the database layer (type registry, result cursors, backend selection),
//! configuration loading, and the command and output plumbing of the `vtstore` CLI.

pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod logging;
pub mod output;

#[macro_use]
pub mod test_macros;

#[cfg(test)]
pub mod test_utils;

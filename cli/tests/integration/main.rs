//! Integration tests for the agentify CLI
//!
//! These tests run the compiled binary or spawn real processes.

mod command_runner;
mod config_command;

//! Unit tests for the agentify CLI
//!
//! These tests use mocked ports and run fast without spawning real tools.

mod architecture;
mod build_service;
mod mocks;
mod property_tests;
mod render_service;
mod toolchain_service;

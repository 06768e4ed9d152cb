//! Integration tests for mwatch-bot.
//!
//! These tests verify the interaction between components:
//! - WebSocket connection lifecycle against a mock exchange
//! - Snapshot bootstrap, stream reconciliation and persistence

pub mod common;

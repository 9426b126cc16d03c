//! Warden - Multi-cluster virtualization control core
//!
//! This library manages fleets of independently-authenticated
//! virtualization cluster endpoints: per-endpoint session lifecycle, a
//! retrying request executor, concurrent batch command dispatch with
//! partial-failure isolation, poll-diff-broadcast state synchronization,
//! and threshold alerting with auto-resolution.

pub mod alerts;
pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod events;
pub mod inventory;
pub mod logging;
pub mod orchestrator;
pub mod poller;
pub mod registry;

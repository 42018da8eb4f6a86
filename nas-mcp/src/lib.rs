//! nas-mcp — MCP tool server for TrueNAS SCALE
//!
//! Exposes Custom App lifecycle, Docker Compose conversion and validation,
//! filesystem browsing under `/mnt`, ZFS dataset/snapshot management and
//! system telemetry as MCP tools. Every tool call goes through the
//! execution pipeline: lookup → argument validation → confirmation guard →
//! backend call → text rendering.

pub mod app;
pub mod backend;
pub mod compose;
pub mod config;
pub mod executor;
pub mod format;
pub mod fs;
pub mod paths;
pub mod registry;
pub mod schema;
pub mod server;
pub mod system;
pub mod zfs;

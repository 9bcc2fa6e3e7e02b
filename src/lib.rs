//! Aviadata publishing bot: fetches aggregated aviation statistics and
//! posts formatted monthly updates on a fixed schedule, deduplicated
//! against an append-only SQLite post log.

pub mod backend;
pub mod config;
pub mod content;
pub mod db;
pub mod engine;
pub mod model;
pub mod publisher;
pub mod schedule;
pub mod server;

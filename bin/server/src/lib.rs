//! automa workflow server.
//!
//! This crate serves the workflow API over HTTP and persists workflows in
//! PostgreSQL.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod service;

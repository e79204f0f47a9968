//! Todos Server - Session-scoped todo lists over HTTP.
//!
//! This crate provides the Todos server, responsible for:
//! - Keeping named lists of todos per visitor session
//! - Validating list and todo names
//! - Projecting lists into display-ready, completion-sorted views
//!
//! # Architecture
//!
//! Each visitor's lists live in a [`store::Session`] held by the in-memory
//! [`session::SessionStore`]. Handlers in [`routes`] load the session named by
//! the request cookie, apply one operation, and write it back. Nothing is
//! persisted across restarts.

pub mod config;
pub mod error;
pub mod ids;
pub mod routes;
pub mod session;
pub mod store;
pub mod types;
pub mod validation;
pub mod view;

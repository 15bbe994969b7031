//! Devochat is a client for holding chat sessions against a pool of remote
//! language models and publishing read-only snapshots of them.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns session state: capability gating, the overlay state
//!   machine, the conversation store, and snapshot publishing.
//! - [`api`] defines wire payloads and the HTTP client for the service.
//! - [`auth`] validates credentials and keeps the session identity.
//! - [`cli`] is the command-line front end built on top of the above.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod auth;
pub mod cli;
pub mod core;
pub mod utils;

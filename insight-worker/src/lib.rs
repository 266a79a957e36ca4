#![deny(clippy::all, clippy::pedantic, clippy::nursery, dead_code)]

pub mod callback;
pub mod dispatch;
pub mod gemini;
pub mod producer;
pub mod prompts;
pub mod queue_processor;
pub mod reconcile;
pub mod routes;
pub mod server;
pub mod services;
pub mod types;

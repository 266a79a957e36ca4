//! Backend storage services for the diary insight worker
//!
//! This crate provides the message queue transport shared by the queue producer
//! and the queue processor.

pub mod queue;

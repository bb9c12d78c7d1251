//! A request/response gateway in front of a line-oriented worker process.
//!
//! Callers submit commands concurrently; the [`dispatcher`] serializes them
//! onto the worker's stdin one at a time and attributes each structured
//! reply on stdout to the single command in flight.

pub mod banner;
pub mod channel;
pub mod commands;
pub mod config;
pub mod console;
pub mod consts;
pub mod decoder;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod queue;
pub mod server;
pub mod spinner;
pub mod worker;

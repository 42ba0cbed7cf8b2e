//! Plain data types exchanged between providers, the engine, and sinks.

pub mod config;
pub mod health;
pub mod log;
pub mod notification;
pub mod session;

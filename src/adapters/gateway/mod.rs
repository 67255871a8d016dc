//! Messaging gateway REST adapter.

pub mod client;
pub mod dto;

pub use client::RestMessageGateway;

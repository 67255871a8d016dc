//! Ticketing backend REST adapter.

mod client;

pub use client::RestTicketingSystem;

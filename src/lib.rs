//! Helpdesk Bot - Conversational Dialog Orchestration
//!
//! This crate drives a chat helpdesk bot: inbound gateway events advance a
//! per-user conversation through a configuration-defined menu graph, with a
//! multi-step ticket-creation wizard submitting to an external backend.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

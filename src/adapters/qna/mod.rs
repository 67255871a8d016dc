//! Knowledge-base (QNA) REST adapter.

mod client;

pub use client::RestKnowledgeBase;

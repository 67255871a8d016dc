//! Server-side command execution adapter.

pub mod runner;

pub use runner::TokioCommandRunner;

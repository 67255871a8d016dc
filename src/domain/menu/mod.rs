//! Menu configuration: document model, compiler, compiled graph.

pub mod compiler;
pub mod document;
pub mod graph;
pub mod keyboard;
pub mod registry;

pub use compiler::{compile, MenuError};
pub use document::MenuDocument;
pub use graph::{
    Action, CaptureSpec, Control, ErrorTexts, FieldSpec, MenuGraph, MenuNode, ReplyFragment,
    TicketFields, TicketSpec, CREATE_TICKET, CREATE_TICKET_PREV_STAGE, FAIL_QNA, FINAL, GREETINGS,
    PENDING_INPUT_VAR, START, WAIT_SEND,
};
pub use keyboard::{typographic_quotes, Keyboard, KeyboardKey};
pub use registry::MenuRegistry;

//! Application layer: the dispatcher and its supporting services.

pub mod dispatcher;
pub mod event;
pub mod locks;
pub mod registry;
pub mod renderer;
pub mod sessions;

pub use dispatcher::{DispatchError, Dispatcher, DispatcherSettings};
pub use event::{EventKind, InboundEvent};
pub use registry::BotRegistry;
pub use sessions::SessionService;

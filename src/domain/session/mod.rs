//! Session state: the per-(user, line) conversation record.

pub mod state;
pub mod ticket;

pub use state::{SessionKey, SessionState, Specialist, UserProfile};
pub use ticket::{ChosenItem, TicketDraft, TicketField};

//! Line-keyed dispatcher table.
//!
//! Built once at startup from the configured lines and injected into the
//! webhook state; there is no process-wide mutable registry.

use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::dispatcher::Dispatcher;

/// One dispatcher per served line.
#[derive(Default)]
pub struct BotRegistry {
    bots: HashMap<Uuid, Arc<Dispatcher>>,
}

impl BotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, line: Uuid, dispatcher: Arc<Dispatcher>) {
        self.bots.insert(line, dispatcher);
    }

    pub fn get(&self, line: Uuid) -> Option<Arc<Dispatcher>> {
        self.bots.get(&line).cloned()
    }

    pub fn lines(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.bots.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.bots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bots.is_empty()
    }
}

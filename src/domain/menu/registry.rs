//! Published menu graph with atomic reload.
//!
//! Readers take a cheap `Arc` snapshot and never hold the lock across a
//! dispatch; a reload compiles the candidate document fully before the
//! swap, so a rejected document leaves the active graph untouched.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use super::compiler::{compile, MenuError};
use super::document::MenuDocument;
use super::graph::MenuGraph;

/// Holds the active compiled graph and the path it was loaded from.
#[derive(Debug)]
pub struct MenuRegistry {
    path: PathBuf,
    graph: RwLock<Arc<MenuGraph>>,
}

impl MenuRegistry {
    /// Load and compile the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns `MenuError` when the file cannot be read, parsed or
    /// compiled. Nothing is published on error.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, MenuError> {
        let path = path.into();
        let graph = compile_file(&path)?;
        Ok(Self {
            path,
            graph: RwLock::new(Arc::new(graph)),
        })
    }

    /// Build a registry around an already compiled graph (used by tests).
    pub fn from_graph(graph: MenuGraph) -> Self {
        Self {
            path: PathBuf::new(),
            graph: RwLock::new(Arc::new(graph)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot the active graph.
    pub async fn snapshot(&self) -> Arc<MenuGraph> {
        self.graph.read().await.clone()
    }

    /// Recompile the document and swap the active graph. On any error the
    /// previous graph stays in effect.
    pub async fn reload(&self) -> Result<(), MenuError> {
        match compile_file(&self.path) {
            Ok(graph) => {
                *self.graph.write().await = Arc::new(graph);
                info!(path = %self.path.display(), "menu document reloaded");
                Ok(())
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "menu reload rejected, keeping active graph");
                Err(err)
            }
        }
    }
}

fn compile_file(path: &Path) -> Result<MenuGraph, MenuError> {
    let input = std::fs::read_to_string(path)?;
    let document = MenuDocument::from_yaml(&input)?;
    compile(&document)
}

//! The host project a pass resolves against.

use jsbind_lookup::{NameEnvironment, StandardLibrary};
use std::sync::Arc;

/// Supplies the types a batch does not declare itself.
pub trait Project: Send + Sync {
    fn name(&self) -> &str;

    /// `None` when the project cannot be consulted at all (for instance it
    /// no longer exists). The pass then falls back to a syntax-only parse.
    fn name_environment(&self) -> Option<Arc<dyn NameEnvironment>>;
}

/// A project whose only dependency is a [`StandardLibrary`].
#[derive(Debug, Clone)]
pub struct StandardProject {
    name: String,
    library: Arc<StandardLibrary>,
}

impl StandardProject {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_library(name, StandardLibrary::new())
    }

    pub fn with_library(name: impl Into<String>, library: StandardLibrary) -> Self {
        StandardProject {
            name: name.into(),
            library: Arc::new(library),
        }
    }
}

impl Project for StandardProject {
    fn name(&self) -> &str {
        &self.name
    }

    fn name_environment(&self) -> Option<Arc<dyn NameEnvironment>> {
        let env: Arc<dyn NameEnvironment> = self.library.clone();
        Some(env)
    }
}

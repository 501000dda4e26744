//! Backend selection.
//!
//! Built-in kinds are constructed directly. Custom backends are resolved by
//! library path through a [`CustomRegistry`] that the host application fills
//! at startup. The library path is only a registry key: nothing is loaded
//! from disk.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use super::EdgeTransport;
use super::error::{EdgeError, EdgeResult};
use super::types::{ConnectType, NodeType};

/// Constructor for a custom backend.
pub type CustomConstructor =
    Arc<dyn Fn(NodeType) -> EdgeResult<Box<dyn EdgeTransport>> + Send + Sync>;

/// Creates transport handles.
pub trait TransportFactory: Send + Sync {
    /// Create a handle for a built-in backend kind.
    fn create(&self, kind: ConnectType, node: NodeType) -> EdgeResult<Box<dyn EdgeTransport>>;

    /// Create a handle for the custom backend registered under `lib_path`.
    fn create_custom(&self, lib_path: &Path, node: NodeType)
    -> EdgeResult<Box<dyn EdgeTransport>>;
}

/// Registry of custom backends keyed by library path.
///
/// Clones share the same registry.
#[derive(Clone, Default)]
pub struct CustomRegistry {
    entries: Arc<RwLock<HashMap<PathBuf, CustomConstructor>>>,
}

impl CustomRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `constructor` under `lib_path`, replacing any previous entry.
    pub fn register<P, F>(&self, lib_path: P, constructor: F)
    where
        P: Into<PathBuf>,
        F: Fn(NodeType) -> EdgeResult<Box<dyn EdgeTransport>> + Send + Sync + 'static,
    {
        self.entries
            .write()
            .insert(lib_path.into(), Arc::new(constructor));
    }

    /// Remove the entry under `lib_path`.
    pub fn unregister(&self, lib_path: &Path) -> bool {
        self.entries.write().remove(lib_path).is_some()
    }

    /// Whether a backend is registered under `lib_path`.
    pub fn contains(&self, lib_path: &Path) -> bool {
        self.entries.read().contains_key(lib_path)
    }

    /// Look up the constructor for `lib_path`.
    pub fn resolve(&self, lib_path: &Path) -> Option<CustomConstructor> {
        self.entries.read().get(lib_path).cloned()
    }
}

impl fmt::Debug for CustomRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.read();
        f.debug_struct("CustomRegistry")
            .field("paths", &entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Factory for the backends compiled into this crate.
#[derive(Debug, Clone, Default)]
pub struct BuiltinFactory {
    custom: CustomRegistry,
}

impl BuiltinFactory {
    /// Create a factory with an empty custom registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a factory that resolves custom backends from `registry`.
    pub fn with_registry(registry: CustomRegistry) -> Self {
        Self { custom: registry }
    }

    /// The custom backend registry.
    pub fn registry(&self) -> &CustomRegistry {
        &self.custom
    }
}

impl TransportFactory for BuiltinFactory {
    #[cfg_attr(not(feature = "tcp"), allow(unused_variables))]
    fn create(&self, kind: ConnectType, node: NodeType) -> EdgeResult<Box<dyn EdgeTransport>> {
        match kind {
            #[cfg(feature = "tcp")]
            ConnectType::Tcp => Ok(Box::new(super::TcpPublisher::new(node)?)),
            ConnectType::Custom => Err(EdgeError::InvalidParameter(
                "custom backends are created from a library path".into(),
            )),
            other => Err(EdgeError::NotSupported(format!(
                "{other} backend is not built in"
            ))),
        }
    }

    fn create_custom(
        &self,
        lib_path: &Path,
        node: NodeType,
    ) -> EdgeResult<Box<dyn EdgeTransport>> {
        let constructor = self
            .custom
            .resolve(lib_path)
            .ok_or_else(|| EdgeError::LibraryNotFound(lib_path.to_path_buf()))?;
        constructor(node)
    }
}

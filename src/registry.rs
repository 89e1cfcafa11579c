use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("id {id:?} is already registered, keeping the existing entry")]
    DuplicateId { id: String },
    #[error("id {id:?} is not registered")]
    NotFound { id: String },
    #[error("constructing {id:?} failed: {message}")]
    Construction { id: String, message: String },
    #[error("registry lock poisoned by a panicking writer")]
    Poisoned,
}

type Factory<T, A> = Arc<dyn Fn(&A) -> Result<Arc<T>, RegistryError> + Send + Sync>;

/// A service locator mapping a string id to a factory for `T`. Plugins
/// (compilers, accelerators, transformation passes) advertise themselves
/// here so callers can instantiate them by name without linking against
/// their concrete types.
///
/// `A` is the fixed configuration type handed to every factory of this
/// registry; registries whose plugins need no configuration use `()`.
///
/// `add` and `create` are safe under concurrent registration and lookup:
/// entries live behind an `RwLock`, so lookups share and registration is
/// exclusive.
pub struct Registry<T: ?Sized, A = ()> {
    entries: RwLock<BTreeMap<String, Factory<T, A>>>,
}

impl<T: ?Sized, A> Registry<T, A> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Register `factory` under `id`. A colliding id is rejected and the
    /// original factory stays in effect: plugin identity collisions are a
    /// load-time programming error, never a silent overwrite.
    pub fn add<F>(&self, id: impl Into<String>, factory: F) -> Result<(), RegistryError>
    where
        F: Fn(&A) -> Result<Arc<T>, RegistryError> + Send + Sync + 'static,
    {
        let id = id.into();
        let mut entries = self.entries.write().map_err(|_| RegistryError::Poisoned)?;
        if entries.contains_key(&id) {
            return Err(RegistryError::DuplicateId { id });
        }
        tracing::debug!(%id, "registry add");
        entries.insert(id, Arc::new(factory));
        Ok(())
    }

    /// Instantiate the plugin registered under `id`.
    pub fn create(&self, id: &str, args: &A) -> Result<Arc<T>, RegistryError> {
        let factory = {
            let entries = self.entries.read().map_err(|_| RegistryError::Poisoned)?;
            entries
                .get(id)
                .cloned()
                .ok_or_else(|| RegistryError::NotFound { id: id.to_string() })?
        };
        // the factory runs outside the lock
        factory(args)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries
            .read()
            .map(|entries| entries.contains_key(id))
            .unwrap_or(false)
    }

    pub fn size(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    /// Registered ids, sorted. Discovery surface for "list available
    /// backends" style queries.
    pub fn ids(&self) -> Vec<String> {
        self.entries
            .read()
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl<T: ?Sized, A> Default for Registry<T, A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync + std::fmt::Debug {
        fn greet(&self) -> &'static str;
    }

    #[derive(Debug)]
    struct English;
    #[derive(Debug)]
    struct Spanish;

    impl Greeter for English {
        fn greet(&self) -> &'static str {
            "hello"
        }
    }

    impl Greeter for Spanish {
        fn greet(&self) -> &'static str {
            "hola"
        }
    }

    #[test]
    fn create_returns_registered_factory_output() {
        let registry: Registry<dyn Greeter> = Registry::new();
        registry.add("en", |_: &()| Ok(Arc::new(English) as _)).unwrap();
        let greeter = registry.create("en", &()).unwrap();
        assert_eq!(greeter.greet(), "hello");
    }

    #[test]
    fn duplicate_id_is_rejected_and_original_kept() {
        let registry: Registry<dyn Greeter> = Registry::new();
        registry.add("greet", |_: &()| Ok(Arc::new(English) as _)).unwrap();
        let err = registry
            .add("greet", |_: &()| Ok(Arc::new(Spanish) as _))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateId {
                id: "greet".to_string()
            }
        );
        assert_eq!(registry.size(), 1);
        assert_eq!(registry.create("greet", &()).unwrap().greet(), "hello");
    }

    #[test]
    fn unknown_id_is_not_found() {
        let registry: Registry<dyn Greeter> = Registry::new();
        let err = registry.create("fr", &()).unwrap_err();
        assert_eq!(
            err,
            RegistryError::NotFound {
                id: "fr".to_string()
            }
        );
    }

    #[test]
    fn ids_are_sorted_for_discovery() {
        let registry: Registry<dyn Greeter> = Registry::new();
        registry.add("es", |_: &()| Ok(Arc::new(Spanish) as _)).unwrap();
        registry.add("en", |_: &()| Ok(Arc::new(English) as _)).unwrap();
        assert_eq!(registry.ids(), vec!["en", "es"]);
    }

    #[test]
    fn concurrent_add_and_lookup() {
        let registry: Arc<Registry<dyn Greeter>> = Arc::new(Registry::new());
        registry.add("en", |_: &()| Ok(Arc::new(English) as _)).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    let _ = registry.add(format!("g{i}"), |_: &()| Ok(Arc::new(Spanish) as _));
                    registry.create("en", &()).unwrap().greet()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), "hello");
        }
        assert_eq!(registry.size(), 9);
    }
}

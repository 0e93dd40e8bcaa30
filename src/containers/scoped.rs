use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::component::Component;
use crate::containers::Resolver;
use crate::error::{Error, Result};
use crate::function::{Function, Injectable};
use crate::registry::ProviderRegistry;
use crate::types::TypeKey;

/// Registry of providers plus an optional parent to fall back to.
///
/// The parent is borrowed: a container never owns or outlives its parent, and a
/// parent knows nothing about its children. Several children may share one
/// parent.
///
/// ```
/// use std::sync::Arc;
/// use lazydi::Container;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct Polite(String);
///
/// impl Greeter for Polite {
///     fn greet(&self) -> String {
///         format!("Good day, {}", self.0)
///     }
/// }
///
/// let root = Container::new();
/// root.provide(|name: String| Arc::new(Polite(name)) as Arc<dyn Greeter>).unwrap();
///
/// let request = Container::with_parent(&root);
/// request.provide_value(String::from("Ada")).unwrap();
/// request.invoke(|greeter: Arc<dyn Greeter>| {
///     assert_eq!(greeter.greet(), "Good day, Ada");
/// }).unwrap();
/// ```
pub struct Container<'p> {
    registry: Mutex<ProviderRegistry>,
    parent: Option<&'p Container<'p>>,
}

impl Container<'static> {
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(ProviderRegistry::new()),
            parent: None,
        }
    }
}

impl Default for Container<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'p> Container<'p> {
    /// Child container; lookups it cannot satisfy go to `parent`.
    pub fn with_parent(parent: &'p Container<'p>) -> Self {
        Self {
            registry: Mutex::new(ProviderRegistry::new()),
            parent: Some(parent),
        }
    }

    pub fn parent(&self) -> Option<&'p Container<'p>> {
        self.parent
    }

    pub(crate) fn registry(&self) -> &Mutex<ProviderRegistry> {
        &self.registry
    }

    /// Register a value or a function.
    ///
    /// A function gets one provider per non-error return value. Either all of them
    /// are registered or none is.
    pub fn provide_component(&self, component: Component) -> Result<()> {
        let mut registry = self.registry.lock();
        match component.into_value() {
            Ok((key, value)) => {
                registry.add_value(key, value).map_err(|err| {
                    warn!(%key, "value provider rejected");
                    err
                })?;
                debug!(%key, "registered value provider");
                Ok(())
            }
            Err(function) => register_function(&mut registry, function),
        }
    }

    pub fn provide_value<T>(&self, value: T) -> Result<()>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.provide_component(Component::value(value))
    }

    /// Register a function whose return values become lazily built singletons.
    pub fn provide<F, Args, M>(&self, function: F) -> Result<()>
    where
        F: Injectable<Args, M>,
    {
        self.provide_component(Component::function(function))
    }

    /// Resolve the parameters of `function` and call it.
    ///
    /// An error returned by `function` is returned unchanged.
    pub fn invoke<F, Args, M>(&self, function: F) -> Result<()>
    where
        F: Injectable<Args, M>,
    {
        self.invoke_all([Component::function(function)])
    }

    /// Invoke every function in order under one lock, stopping at the first error.
    ///
    /// Ancestors are locked only while arguments are being resolved. The lock of
    /// this container is held until the whole batch finishes, so invoked functions
    /// must not call back into it.
    pub fn invoke_all<I>(&self, functions: I) -> Result<()>
    where
        I: IntoIterator<Item = Component>,
    {
        let mut resolver = Resolver::open(self);
        for component in functions {
            let function = component.into_function()?;
            resolver.invoke(&function)?;
        }
        Ok(())
    }

    /// Resolve one type as if it were the only parameter of an invoked function.
    pub fn resolve<T>(&self) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let key = TypeKey::of::<T>();
        let value = Resolver::open(self).resolve(key, 0)?;
        value
            .downcast_ref::<T>()
            .cloned()
            .ok_or(Error::TypeMismatch { key })
    }

    /// Whether this container itself has a provider for `T`. Parents are not consulted.
    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.registry.lock().contains(&TypeKey::of::<T>())
    }

    /// Number of types registered in this container.
    pub fn len(&self) -> usize {
        self.registry.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.lock().is_empty()
    }

    /// [`Container::provide_value`] that panics on error.
    ///
    /// # Panics
    ///
    /// If the value cannot be registered.
    pub fn must_provide_value<T>(&self, value: T) -> &Self
    where
        T: Clone + Send + Sync + 'static,
    {
        if let Err(err) = self.provide_value(value) {
            error!(error = %err, "must_provide_value failed");
            panic!("{err}");
        }
        self
    }

    /// [`Container::provide`] that panics on error.
    ///
    /// # Panics
    ///
    /// If the function cannot be registered.
    pub fn must_provide<F, Args, M>(&self, function: F) -> &Self
    where
        F: Injectable<Args, M>,
    {
        if let Err(err) = self.provide(function) {
            error!(error = %err, "must_provide failed");
            panic!("{err}");
        }
        self
    }

    /// [`Container::invoke`] that panics on error.
    ///
    /// # Panics
    ///
    /// If a parameter cannot be resolved or `function` returns an error.
    pub fn must_invoke<F, Args, M>(&self, function: F) -> &Self
    where
        F: Injectable<Args, M>,
    {
        if let Err(err) = self.invoke(function) {
            error!(error = %err, "must_invoke failed");
            panic!("{err}");
        }
        self
    }
}

fn register_function(registry: &mut ProviderRegistry, function: Function) -> Result<()> {
    let signature = function.signature();
    let provided: Vec<(usize, TypeKey)> = function
        .returns()
        .iter()
        .enumerate()
        .filter_map(|(index, slot)| slot.key().map(|key| (index, key)))
        .collect();
    if provided.is_empty() {
        warn!(signature, "function has nothing to provide");
        return Err(Error::NoProvidableReturn { signature });
    }

    let mut seen = HashSet::with_capacity(provided.len());
    for (_, key) in &provided {
        if registry.contains(key) || !seen.insert(*key) {
            warn!(signature, %key, "function provider rejected");
            return Err(Error::Registration {
                signature,
                source: Box::new(Error::DuplicateProvider { key: *key }),
            });
        }
    }

    let function = Arc::new(function);
    for (index, key) in provided {
        registry
            .add_function(Arc::clone(&function), key, index)
            .map_err(|err| Error::Registration {
                signature,
                source: Box::new(err),
            })?;
        debug!(%key, index, signature, "registered function provider");
    }
    Ok(())
}

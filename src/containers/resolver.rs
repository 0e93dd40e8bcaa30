//! Resolution session shared by every nested call of one top-level invocation.

use parking_lot::MutexGuard;
use tracing::trace;

use crate::containers::Container;
use crate::error::{Error, Result};
use crate::function::Function;
use crate::registry::ProviderRegistry;
use crate::types::{TypeKey, Value};

/// Locks held on behalf of one top-level call.
///
/// `held[d]` guards the registry of the container `d` steps above the leaf. The
/// leaf is locked when the session opens, ancestors the first time a lookup
/// climbs to them, always leaf first. Ancestor guards are dropped before an
/// invoked function body runs; the leaf guard lives until the session is
/// dropped. Nothing below this type takes a lock again.
pub struct Resolver<'c> {
    leaf: &'c Container<'c>,
    held: Vec<MutexGuard<'c, ProviderRegistry>>,
}

impl<'c> Resolver<'c> {
    pub(crate) fn open(leaf: &'c Container<'c>) -> Self {
        let guard = leaf.registry().lock();
        Self {
            leaf,
            held: vec![guard],
        }
    }

    /// Find a provider for `key`, starting at the leaf and climbing the parent chain.
    ///
    /// The provider always runs against this session, whichever container owns it.
    pub fn resolve(&mut self, key: TypeKey, index: usize) -> Result<Value> {
        let mut current = Some(self.leaf);
        let mut depth = 0;
        while let Some(container) = current {
            if self.held.len() == depth {
                trace!(%key, depth, "delegating lookup to parent container");
                self.held.push(container.registry().lock());
            }
            if let Some(provider) = self.held[depth].get(&key) {
                trace!(%key, depth, kind = provider.kind(), "resolved parameter");
                return provider.provide(self);
            }
            current = container.parent();
            depth += 1;
        }

        trace!(%key, index, "no provider in the parent chain");
        Err(Error::ProviderNotFound { index, key })
    }

    /// Resolve every parameter of `function` in order and call it.
    ///
    /// Used for nested provider builds: every lock taken so far stays held while
    /// the function runs, so a provider's cache is filled at most once.
    pub fn call(&mut self, function: &Function) -> Result<Vec<Option<Value>>> {
        let args = self.arguments(function)?;
        function.call(args)
    }

    /// Like [`Resolver::call`], for the function a caller asked to invoke.
    ///
    /// Ancestors are unlocked once the arguments are resolved, so the function body
    /// only blocks users of the leaf container.
    pub(crate) fn invoke(&mut self, function: &Function) -> Result<Vec<Option<Value>>> {
        let args = self.arguments(function)?;
        self.release_ancestors();
        function.call(args)
    }

    fn release_ancestors(&mut self) {
        if self.held.len() > 1 {
            trace!(released = self.held.len() - 1, "unlocking ancestor containers");
            self.held.truncate(1);
        }
    }

    /// Stops at the first parameter that cannot be resolved. Errors returned by
    /// user functions are passed through as they are; everything else is wrapped
    /// with the failing parameter's position.
    fn arguments(&mut self, function: &Function) -> Result<Vec<Value>> {
        let mut args = Vec::with_capacity(function.parameters().len());
        for (index, key) in function.parameters().iter().enumerate() {
            match self.resolve(*key, index) {
                Ok(value) => args.push(value),
                Err(err @ Error::Invocation(_)) => return Err(err),
                Err(err) => {
                    return Err(Error::ParameterResolution {
                        signature: function.signature(),
                        index,
                        key: *key,
                        source: Box::new(err),
                    })
                }
            }
        }
        Ok(args)
    }
}

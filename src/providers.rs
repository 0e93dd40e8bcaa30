use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::containers::Resolver;
use crate::error::{Error, Result};
use crate::function::Function;
use crate::interfaces::Provider;
use crate::types::{TypeKey, Value};

/// Holds an already known value.
pub struct ValueProvider {
    value: Value,
}

impl ValueProvider {
    pub fn new(value: Value) -> Self {
        Self { value }
    }
}

impl Provider for ValueProvider {
    fn provide(&self, _resolver: &mut Resolver<'_>) -> Result<Value> {
        Ok(Arc::clone(&self.value))
    }

    fn kind(&self) -> &'static str {
        "value"
    }
}

enum Slot {
    Empty,
    Building,
    Ready(Value),
}

/// Puts a `Building` slot back to `Empty` if the build unwinds.
struct ResetOnUnwind<'a>(&'a Mutex<Slot>);

impl Drop for ResetOnUnwind<'_> {
    fn drop(&mut self) {
        *self.0.lock() = Slot::Empty;
    }
}

/// Lazily calls a function and keeps the return value at `index`.
///
/// The function runs at most once per provider while it succeeds. Providers
/// created for other return values of the same function keep their own slot and
/// call the function again on their own first use.
pub struct FunctionProvider {
    function: Arc<Function>,
    key: TypeKey,
    index: usize,
    slot: Mutex<Slot>,
}

impl FunctionProvider {
    pub fn new(function: Arc<Function>, key: TypeKey, index: usize) -> Self {
        Self {
            function,
            key,
            index,
            slot: Mutex::new(Slot::Empty),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.slot.lock(), Slot::Ready(_))
    }

    fn build(&self, resolver: &mut Resolver<'_>) -> Result<Value> {
        let mut values = resolver.call(&self.function)?;
        let returned = values.len();
        values
            .get_mut(self.index)
            .and_then(Option::take)
            .ok_or(Error::ReturnMismatch {
                signature: self.function.signature(),
                expected: self.index + 1,
                actual: returned,
            })
    }
}

impl Provider for FunctionProvider {
    fn provide(&self, resolver: &mut Resolver<'_>) -> Result<Value> {
        {
            let mut slot = self.slot.lock();
            match &*slot {
                Slot::Ready(value) => return Ok(Arc::clone(value)),
                Slot::Building => return Err(Error::CircularDependency { key: self.key }),
                Slot::Empty => *slot = Slot::Building,
            }
        }

        // The slot lock is released while the function runs so that a cycle back
        // to this provider is reported instead of deadlocking.
        let reset = ResetOnUnwind(&self.slot);
        let built = self.build(resolver);
        std::mem::forget(reset);

        let mut slot = self.slot.lock();
        match built {
            Ok(value) => {
                debug!(key = %self.key, signature = self.function.signature(), "function provider cached its value");
                *slot = Slot::Ready(Arc::clone(&value));
                Ok(value)
            }
            Err(err) => {
                *slot = Slot::Empty;
                Err(err)
            }
        }
    }

    fn kind(&self) -> &'static str {
        "function"
    }
}

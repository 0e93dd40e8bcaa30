use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::function::Function;
use crate::interfaces::Provider;
use crate::providers::{FunctionProvider, ValueProvider};
use crate::types::{TypeKey, Value};

/// One provider per type. Not synchronized; the owning container locks it.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<TypeKey, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &TypeKey) -> bool {
        self.providers.contains_key(key)
    }

    pub fn get(&self, key: &TypeKey) -> Option<Arc<dyn Provider>> {
        self.providers.get(key).cloned()
    }

    pub fn add_value(&mut self, key: TypeKey, value: Value) -> Result<()> {
        self.add_provider(key, Arc::new(ValueProvider::new(value)))
    }

    pub fn add_function(&mut self, function: Arc<Function>, key: TypeKey, index: usize) -> Result<()> {
        self.add_provider(key, Arc::new(FunctionProvider::new(function, key, index)))
    }

    fn add_provider(&mut self, key: TypeKey, provider: Arc<dyn Provider>) -> Result<()> {
        if self.contains(&key) {
            return Err(Error::DuplicateProvider { key });
        }
        self.providers.insert(key, provider);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::function::{Function, Injectable};
use crate::types::{TypeKey, Value};

enum Kind {
    Value { key: TypeKey, value: Value },
    Function(Function),
}

/// Anything a container accepts: a plain value or a function.
///
/// Values are `Clone`, which the error kind (`anyhow::Error`) is not, so a
/// value component can never be of the error kind.
pub struct Component(Kind);

impl Component {
    pub fn value<T>(value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        Component(Kind::Value {
            key: TypeKey::of::<T>(),
            value: Arc::new(value),
        })
    }

    pub fn function<F, Args, M>(function: F) -> Self
    where
        F: Injectable<Args, M>,
    {
        Component(Kind::Function(function.into_function()))
    }

    pub fn is_function(&self) -> bool {
        matches!(self.0, Kind::Function(_))
    }

    pub(crate) fn into_value(self) -> std::result::Result<(TypeKey, Value), Function> {
        match self.0 {
            Kind::Value { key, value } => Ok((key, value)),
            Kind::Function(function) => Err(function),
        }
    }

    pub(crate) fn into_function(self) -> Result<Function> {
        match self.0 {
            Kind::Function(function) => Ok(function),
            Kind::Value { key, .. } => Err(Error::NotAFunction { key }),
        }
    }
}

impl From<Function> for Component {
    fn from(function: Function) -> Self {
        Component(Kind::Function(function))
    }
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Kind::Value { key, .. } => f.debug_tuple("Value").field(key).finish(),
            Kind::Function(function) => f.debug_tuple("Function").field(function).finish(),
        }
    }
}

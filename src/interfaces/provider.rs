
use crate::containers::Resolver;
use crate::error::Result;
use crate::types::Value;

/// Produces the value of one type on demand.
///
/// `resolver` is the session of the container that asked for the value, which is
/// not necessarily the container holding this provider: a function provider
/// registered in a parent resolves its own parameters starting from the child.
pub trait Provider: Send + Sync {
    fn provide(&self, resolver: &mut Resolver<'_>) -> Result<Value>;

    /// Short label for diagnostics.
    fn kind(&self) -> &'static str;
}

//! Lightweight dependency injection.
//!
//! A [`Container`] maps types to providers. A provider is either a value or a
//! function; functions are called lazily, the first time one of their return
//! types is needed, and the result is kept for the lifetime of the container.
//! [`Container::invoke`] resolves every parameter of a function from the
//! container (falling back to its parent chain) and calls it.
//!
//! ```rust
//! use lazydi::Container;
//!
//! #[derive(Clone)]
//! struct Config {
//!     url: String,
//! }
//!
//! #[derive(Clone)]
//! struct Database {
//!     url: String,
//! }
//!
//! let container = Container::new();
//! container.provide_value(Config { url: "postgres://localhost".into() }).unwrap();
//! container.provide(|config: Config| Database { url: config.url }).unwrap();
//!
//! container.invoke(|db: Database| {
//!     assert_eq!(db.url, "postgres://localhost");
//! }).unwrap();
//! ```
//!
//! Functions returning `anyhow::Result<T>` report failures through the error slot;
//! the error reaches the caller of [`Container::invoke`] unchanged.
//!
//! ```rust
//! use lazydi::Container;
//!
//! let container = Container::new();
//! container.provide(|| -> anyhow::Result<u16> { anyhow::bail!("port is taken") }).unwrap();
//!
//! let err = container.invoke(|_port: u16| {}).unwrap_err();
//! assert_eq!(err.to_string(), "port is taken");
//! ```

pub mod component;
pub mod containers;
pub mod error;
pub mod function;
pub mod interfaces;
pub mod providers;
pub mod registry;
pub mod types;

pub use component::Component;
pub use containers::Container;
pub use containers::Resolver;
pub use error::Error;
pub use error::Result;
pub use function::Function;
pub use function::Injectable;
pub use function::Multi;
pub use function::Returns;
pub use interfaces::Provider;
pub use types::ReturnSlot;
pub use types::TypeKey;
pub use types::Value;

pub use lazydi_derives::Inject;

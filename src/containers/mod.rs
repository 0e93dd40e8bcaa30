pub mod resolver;
pub mod scoped;

pub use resolver::Resolver;
pub use scoped::Container;

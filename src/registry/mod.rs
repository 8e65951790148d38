//! Name -> value registries loaded once at startup.

mod categories;
mod flags;

pub use categories::CategoryRegistry;
pub use flags::FlagRegistry;

//! Cache domain - backing abstraction and key derivation

mod key;
mod repository;

pub use key::{build_key, KEY_SEPARATOR};
pub use repository::Cache;

#[cfg(test)]
pub use repository::mock::MockCache;

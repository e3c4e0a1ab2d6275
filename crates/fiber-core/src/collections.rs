//! Hash collections used internally, switchable to `std` with the `std-hash` feature.

#[cfg(feature = "std-hash")]
pub mod map {
    pub use std::collections::HashSet;
}

#[cfg(not(feature = "std-hash"))]
pub mod map {
    pub type HashSet<K> = hashbrown::HashSet<K, ahash::RandomState>;
}

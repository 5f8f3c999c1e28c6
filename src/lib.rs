//! Watch files and object-store objects for changes and receive their
//! content when they do.
//!

pub use sprout_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use sprout_internal::prelude::*;
}

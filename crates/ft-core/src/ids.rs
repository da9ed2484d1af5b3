//! Strongly typed identifier wrappers.
//!
//! Entity and route ids come from the REST layer as opaque strings
//! (`"V001"`, `"R-17"`), so both wrappers hold a shared `Arc<str>`: cloning
//! an id into every snapshot is a refcount bump, not an allocation.

use std::fmt;
use std::sync::Arc;

/// Generate a typed string-key wrapper.
macro_rules! typed_key {
    ($(#[$attr:meta])* $vis:vis struct $name:ident;) => {
        $(#[$attr])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        $vis struct $name(Arc<str>);

        impl $name {
            pub fn new(key: impl Into<Arc<str>>) -> Self {
                Self(key.into())
            }

            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(Arc::from(s))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(Arc::from(s))
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

typed_key! {
    /// Stable key of one tracked entity (vehicle).
    pub struct EntityId;
}

typed_key! {
    /// Key of a route in a `RouteSet`.
    pub struct RouteId;
}

//! Memoised route profiles keyed by route identity.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use ft_core::{LatLng, RouteId};

use crate::RouteProfile;

#[cfg(not(feature = "fx-hash"))]
type KeyMap<V> = std::collections::HashMap<RouteKey, V>;
#[cfg(feature = "fx-hash")]
type KeyMap<V> = rustc_hash::FxHashMap<RouteKey, V>;

// ── RouteKey ──────────────────────────────────────────────────────────────────

/// Identity of a route for memoisation purposes.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum RouteKey {
    /// A named route from a `RouteSet`.
    Id(RouteId),
    /// An inline stop list, identified by its content fingerprint.
    Inline(u64),
}

impl RouteKey {
    /// Key for an inline stop list.
    pub fn inline(stops: &[LatLng]) -> RouteKey {
        RouteKey::Inline(fingerprint(stops))
    }
}

impl std::fmt::Display for RouteKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteKey::Id(id)     => write!(f, "route {id}"),
            RouteKey::Inline(fp) => write!(f, "inline route {fp:016x}"),
        }
    }
}

/// Content hash of a stop list (bit-exact on the coordinates).
pub fn fingerprint(stops: &[LatLng]) -> u64 {
    // DefaultHasher::new() uses fixed keys, so fingerprints are stable for
    // the life of the process.
    let mut h = std::collections::hash_map::DefaultHasher::new();
    stops.len().hash(&mut h);
    for p in stops {
        p.lat.to_bits().hash(&mut h);
        p.lng.to_bits().hash(&mut h);
    }
    h.finish()
}

// ── ProfileCache ──────────────────────────────────────────────────────────────

struct Entry {
    fingerprint: u64,
    profile:     Arc<RouteProfile>,
}

/// Builds each [`RouteProfile`] once per (key, stop list) pair.
///
/// A key whose stop list changes (e.g. a route edited in the dashboard) is
/// detected by fingerprint mismatch and rebuilt on next access.
#[derive(Default)]
pub struct ProfileCache {
    entries: KeyMap<Entry>,
    builds:  u64,
}

impl ProfileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached profile for `key`, building it from `stops` if the
    /// key is new or its stop list changed.
    pub fn get_or_build(&mut self, key: &RouteKey, stops: &[LatLng]) -> Arc<RouteProfile> {
        let fp = match key {
            RouteKey::Inline(fp) => *fp,
            RouteKey::Id(_)      => fingerprint(stops),
        };

        if let Some(entry) = self.entries.get(key) {
            if entry.fingerprint == fp {
                return Arc::clone(&entry.profile);
            }
            tracing::debug!(%key, "stop list changed, rebuilding profile");
        }

        let profile = Arc::new(RouteProfile::build(stops));
        self.builds += 1;
        tracing::trace!(
            %key,
            stops = stops.len(),
            length_m = profile.total_length,
            "built route profile"
        );
        self.entries.insert(
            key.clone(),
            Entry { fingerprint: fp, profile: Arc::clone(&profile) },
        );
        profile
    }

    /// Drop every entry whose key fails `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&RouteKey) -> bool) {
        self.entries.retain(|k, _| keep(k));
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total profiles built since creation (cache misses).
    #[inline]
    pub fn builds(&self) -> u64 {
        self.builds
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

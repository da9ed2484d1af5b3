//! `RouteSet` — named route geometry supplied by the route collaborator.

use std::collections::HashMap;
use std::sync::Arc;

use ft_core::{LatLng, RouteId};

/// Stop lists keyed by [`RouteId`].
///
/// Stop lists are `Arc<[LatLng]>` so the set can be cloned into the
/// simulation thread without copying geometry.
#[derive(Clone, Debug, Default)]
pub struct RouteSet {
    routes: HashMap<RouteId, Arc<[LatLng]>>,
}

impl RouteSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a route, returning the previous stop list.
    pub fn insert(&mut self, id: RouteId, stops: impl Into<Arc<[LatLng]>>) -> Option<Arc<[LatLng]>> {
        self.routes.insert(id, stops.into())
    }

    #[inline]
    pub fn get(&self, id: &RouteId) -> Option<&Arc<[LatLng]>> {
        self.routes.get(id)
    }

    #[inline]
    pub fn contains(&self, id: &RouteId) -> bool {
        self.routes.contains_key(id)
    }

    pub fn remove(&mut self, id: &RouteId) -> Option<Arc<[LatLng]>> {
        self.routes.remove(id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RouteId, &Arc<[LatLng]>)> {
        self.routes.iter()
    }
}

impl FromIterator<(RouteId, Vec<LatLng>)> for RouteSet {
    fn from_iter<I: IntoIterator<Item = (RouteId, Vec<LatLng>)>>(iter: I) -> Self {
        Self {
            routes: iter.into_iter().map(|(id, stops)| (id, Arc::from(stops))).collect(),
        }
    }
}

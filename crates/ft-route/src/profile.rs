//! `RouteProfile` — a polyline parameterised by distance travelled.

use ft_core::LatLng;

/// Floor applied to a segment length before dividing by it.
const SEGMENT_EPS_M: f64 = 1e-9;

/// Distance-parameterised representation of a route polyline.
///
/// Immutable once built.  `cumulative[i]` is the distance in metres from the
/// first stop to stop `i`, so `cumulative[0] == 0` and
/// `cumulative.last() == total_length`.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteProfile {
    pub stops:           Vec<LatLng>,
    /// Haversine length of each segment, `len == stops.len() - 1`.
    pub segment_lengths: Vec<f64>,
    /// Prefix sums of `segment_lengths`, `len == stops.len()`.
    pub cumulative:      Vec<f64>,
    pub total_length:    f64,
}

impl RouteProfile {
    /// Build a profile from an ordered stop list.
    ///
    /// Fewer than two stops yields `total_length == 0`, as does a list whose
    /// stops all coincide.  Callers check [`is_usable`][Self::is_usable]
    /// before interpolating.
    pub fn build(stops: &[LatLng]) -> RouteProfile {
        if stops.len() < 2 {
            return RouteProfile {
                stops:           stops.to_vec(),
                segment_lengths: Vec::new(),
                cumulative:      vec![0.0; stops.len()],
                total_length:    0.0,
            };
        }

        let segment_lengths: Vec<f64> = stops
            .windows(2)
            .map(|w| w[0].distance_m(w[1]))
            .collect();

        let mut cumulative = Vec::with_capacity(stops.len());
        let mut acc = 0.0;
        cumulative.push(acc);
        for len in &segment_lengths {
            acc += len;
            cumulative.push(acc);
        }

        RouteProfile {
            stops: stops.to_vec(),
            segment_lengths,
            cumulative,
            total_length: acc,
        }
    }

    /// `true` when the profile has positive, finite length.
    #[inline]
    pub fn is_usable(&self) -> bool {
        self.total_length.is_finite() && self.total_length > 0.0
    }

    /// Number of segments.
    #[inline]
    pub fn segment_count(&self) -> usize {
        self.segment_lengths.len()
    }

    /// Find the segment containing `progress` and the local parameter on it.
    ///
    /// Returns `(i, t)` with `cumulative[i] <= progress < cumulative[i + 1]`
    /// and `t ∈ [0, 1]`.  Progress at or past the end maps to the last
    /// segment with `t = 1`; negative progress maps to the first with `t = 0`.
    /// Returns `None` for a profile without segments.
    pub fn segment_at(&self, progress: f64) -> Option<(usize, f64)> {
        let n = self.segment_count();
        if n == 0 {
            return None;
        }

        if progress >= self.total_length {
            return Some((n - 1, 1.0));
        }

        // Linear scan: routes handed to the dashboard are tens of stops.
        let i = (0..n)
            .find(|&i| progress < self.cumulative[i + 1])
            .unwrap_or(n - 1);

        let seg_len = self.segment_lengths[i].max(SEGMENT_EPS_M);
        let t = ((progress - self.cumulative[i]) / seg_len).clamp(0.0, 1.0);
        Some((i, t))
    }

    /// Coordinate at `progress` metres along the route.
    ///
    /// Planar interpolation between the two endpoints of the containing
    /// segment.  `None` for a profile without segments.
    pub fn locate(&self, progress: f64) -> Option<LatLng> {
        let (i, t) = self.segment_at(progress)?;
        // Endpoints are returned verbatim; lerp at t = 1 can be off by an ulp.
        if progress >= self.total_length {
            return self.last_stop();
        }
        Some(self.stops[i].lerp(self.stops[i + 1], t))
    }

    pub fn first_stop(&self) -> Option<LatLng> {
        self.stops.first().copied()
    }

    pub fn last_stop(&self) -> Option<LatLng> {
        self.stops.last().copied()
    }
}

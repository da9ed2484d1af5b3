//! Geographic coordinate type and spatial utilities.
//!
//! `LatLng` uses `f64` latitude/longitude.  Simulated vehicles move a few
//! metres per tick, so single precision (≈1 m at the equator) would quantise
//! the motion visibly.

/// Mean Earth radius in metres.  Every distance in the engine derives from it.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A WGS-84 geographic coordinate in degrees.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    #[inline]
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Haversine great-circle distance in metres.
    pub fn distance_m(self, other: LatLng) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();

        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();

        let a = (d_lat * 0.5).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lng * 0.5).sin().powi(2);

        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_M * c
    }

    /// Planar linear interpolation between `self` (t = 0) and `other` (t = 1).
    ///
    /// Treats degrees as a flat plane.  Over the few hundred metres of a
    /// route segment the error against the geodesic is negligible.
    #[inline]
    pub fn lerp(self, other: LatLng, t: f64) -> LatLng {
        LatLng {
            lat: self.lat + (other.lat - self.lat) * t,
            lng: self.lng + (other.lng - self.lng) * t,
        }
    }

    /// Move by `step_deg` degrees along `heading_rad` (0 = north, clockwise).
    #[inline]
    pub fn offset_deg(self, heading_rad: f64, step_deg: f64) -> LatLng {
        LatLng {
            lat: self.lat + step_deg * heading_rad.cos(),
            lng: self.lng + step_deg * heading_rad.sin(),
        }
    }

    /// `true` when both components are finite numbers.
    #[inline]
    pub fn is_finite(self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

impl std::fmt::Display for LatLng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lng)
    }
}

// ── GeoBounds ─────────────────────────────────────────────────────────────────

/// An axis-aligned lat/lng box used to keep random-walk motion inside a
/// service area.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoBounds {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lng_min: f64,
    pub lng_max: f64,
}

impl GeoBounds {
    pub fn new(lat_min: f64, lat_max: f64, lng_min: f64, lng_max: f64) -> Self {
        Self { lat_min, lat_max, lng_min, lng_max }
    }

    #[inline]
    pub fn contains(&self, p: LatLng) -> bool {
        (self.lat_min..=self.lat_max).contains(&p.lat)
            && (self.lng_min..=self.lng_max).contains(&p.lng)
    }

    /// Clamp `p` onto the box.
    #[inline]
    pub fn clamp(&self, p: LatLng) -> LatLng {
        LatLng {
            lat: p.lat.clamp(self.lat_min, self.lat_max),
            lng: p.lng.clamp(self.lng_min, self.lng_max),
        }
    }
}

//! Unit tests for ft-core primitives.

#[cfg(test)]
mod ids {
    use std::collections::HashMap;

    use crate::{EntityId, RouteId};

    #[test]
    fn display_is_raw_key() {
        assert_eq!(EntityId::from("V001").to_string(), "V001");
        assert_eq!(RouteId::new("R-7").as_str(), "R-7");
    }

    #[test]
    fn usable_as_map_key_with_str_lookup() {
        let mut m = HashMap::new();
        m.insert(EntityId::from("V002"), 2);
        assert_eq!(m.get("V002"), Some(&2));
    }

    #[test]
    fn ordering_is_lexical() {
        assert!(EntityId::from("V001") < EntityId::from("V002"));
    }
}

#[cfg(test)]
mod geo {
    use crate::{GeoBounds, LatLng};

    #[test]
    fn zero_distance() {
        let p = LatLng::new(12.97, 77.59);
        assert!(p.distance_m(p) < 1e-6);
    }

    #[test]
    fn one_degree_of_latitude() {
        // 1° of arc on a 6 371 km sphere = 111 194.93 m
        let a = LatLng::new(12.0, 77.5);
        let b = LatLng::new(13.0, 77.5);
        let d = a.distance_m(b);
        assert!((d - 111_194.93).abs() < 0.5, "got {d}");
    }

    #[test]
    fn distance_is_symmetric() {
        let a = LatLng::new(12.85, 77.45);
        let b = LatLng::new(13.10, 77.75);
        assert!((a.distance_m(b) - b.distance_m(a)).abs() < 1e-6);
    }

    #[test]
    fn lerp_endpoints_and_midpoint() {
        let a = LatLng::new(0.0, 0.0);
        let b = LatLng::new(2.0, 4.0);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        assert_eq!(a.lerp(b, 0.5), LatLng::new(1.0, 2.0));
    }

    #[test]
    fn offset_north_increases_lat() {
        let p = LatLng::new(10.0, 10.0).offset_deg(0.0, 0.001);
        assert!((p.lat - 10.001).abs() < 1e-12);
        assert!((p.lng - 10.0).abs() < 1e-12);
    }

    #[test]
    fn bounds_clamp() {
        let b = GeoBounds::new(12.85, 13.10, 77.45, 77.75);
        let outside = LatLng::new(14.0, 77.0);
        assert!(!b.contains(outside));
        let clamped = b.clamp(outside);
        assert_eq!(clamped, LatLng::new(13.10, 77.45));
        assert!(b.contains(clamped));
    }

    #[test]
    fn nan_is_not_finite() {
        assert!(!LatLng::new(f64::NAN, 0.0).is_finite());
        assert!(LatLng::new(1.0, 2.0).is_finite());
    }
}

#[cfg(test)]
mod time {
    use std::time::Duration;

    use crate::{Tick, TickClock};

    #[test]
    fn tick_arithmetic() {
        assert_eq!(Tick(10) + 5, Tick(15));
        assert_eq!(Tick(3).next(), Tick(4));
        assert_eq!(Tick(15).since(Tick(10)), 5);
        assert_eq!(Tick(1).since(Tick(10)), 0);
    }

    #[test]
    fn clock_from_hz() {
        let mut clock = TickClock::from_hz(20.0);
        assert_eq!(clock.interval, Duration::from_millis(50));
        assert!((clock.dt_secs() - 0.05).abs() < 1e-12);
        clock.advance();
        clock.advance();
        assert_eq!(clock.current_tick, Tick(2));
        assert_eq!(clock.elapsed(), Duration::from_millis(100));
    }

    #[test]
    fn display() {
        assert_eq!(Tick(7).to_string(), "T7");
    }
}

#[cfg(test)]
mod rng {
    use crate::{EntityRng, SimRng};

    #[test]
    fn same_seed_same_slot_same_stream() {
        let mut a = EntityRng::new(42, 3);
        let mut b = EntityRng::new(42, 3);
        for _ in 0..16 {
            assert_eq!(a.heading(), b.heading());
        }
    }

    #[test]
    fn different_slots_diverge() {
        let mut a = EntityRng::new(42, 0);
        let mut b = EntityRng::new(42, 1);
        let xs: Vec<f64> = (0..8).map(|_| a.heading()).collect();
        let ys: Vec<f64> = (0..8).map(|_| b.heading()).collect();
        assert_ne!(xs, ys);
    }

    #[test]
    fn heading_in_range() {
        let mut r = EntityRng::new(7, 0);
        for _ in 0..1_000 {
            let h = r.heading();
            assert!((0.0..std::f64::consts::TAU).contains(&h));
        }
    }

    #[test]
    fn sim_rng_reproducible() {
        assert_eq!(SimRng::new(9).next_seed(), SimRng::new(9).next_seed());
    }
}

#[cfg(test)]
mod config {
    use crate::{EngineConfig, GeoBounds, LoopPolicy, SimConfig, TransportConfig};

    #[test]
    fn defaults_match_engine_contract() {
        let c = EngineConfig::default();
        assert_eq!(c.sim.tick_hz, 20.0);
        assert_eq!(c.sim.tick_interval().as_millis(), 50);
        assert_eq!(c.sim.default_loop_policy, LoopPolicy::Loop);
        assert_eq!(c.transport.keepalive_interval().as_secs(), 30);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn loop_policy_parse() {
        assert_eq!(LoopPolicy::parse("loop"), Some(LoopPolicy::Loop));
        assert_eq!(LoopPolicy::parse(" stop-at-end "), Some(LoopPolicy::StopAtEnd));
        assert_eq!(LoopPolicy::parse("bounce"), None);
        assert_eq!(LoopPolicy::StopAtEnd.to_string(), "stop-at-end");
    }

    #[test]
    fn rejects_zero_tick_rate() {
        let c = SimConfig { tick_hz: 0.0, ..SimConfig::default() };
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_tick_rate_outside_range() {
        for hz in [1e-20, -5.0, f64::NAN, f64::INFINITY, 1e9] {
            let c = SimConfig { tick_hz: hz, ..SimConfig::default() };
            assert!(c.validate().is_err(), "tick_hz {hz} accepted");
            // Never panics, even for a rate validate rejects.
            assert_eq!(c.tick_interval().as_millis(), 50);
        }
        let slow = SimConfig { tick_hz: 0.01, ..SimConfig::default() };
        assert!(slow.validate().is_ok());
        assert_eq!(slow.tick_interval().as_secs(), 100);
    }

    #[test]
    fn rejects_zero_frame_cap() {
        let c = SimConfig { max_frame_dt_ms: 0, ..SimConfig::default() };
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_overlong_transport_timers() {
        let c = TransportConfig { keepalive_interval_ms: u64::MAX, ..TransportConfig::default() };
        assert!(c.validate().is_err());
        let c = TransportConfig { liveness_timeout_ms: Some(u64::MAX), ..TransportConfig::default() };
        assert!(c.validate().is_err());
        let c = TransportConfig { liveness_timeout_ms: None, ..TransportConfig::default() };
        assert!(c.validate().is_ok());
    }

    #[test]
    fn rejects_inverted_bounds() {
        let mut c = SimConfig::default();
        c.walk.bounds = Some(GeoBounds::new(13.0, 12.0, 77.0, 78.0));
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_base_above_max_delay() {
        let c = TransportConfig { base_delay_ms: 60_000, ..TransportConfig::default() };
        assert!(c.validate().is_err());
    }
}

#[cfg(test)]
mod entity {
    use std::sync::Arc;

    use crate::{LatLng, LoopPolicy, RosterUpdate, RouteId, RouteRef, Tick, TrackedEntity};

    #[test]
    fn speed_conversion() {
        let e = TrackedEntity::new("V001", LatLng::default(), 36.0);
        assert!((e.speed_mps() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn builder_helpers() {
        let e = TrackedEntity::new("V002", LatLng::default(), 20.0)
            .with_route(RouteRef::Id(RouteId::from("R1")))
            .with_loop_policy(LoopPolicy::StopAtEnd)
            .parked();
        assert_eq!(e.route, Some(RouteRef::Id(RouteId::from("R1"))));
        assert_eq!(e.loop_policy, Some(LoopPolicy::StopAtEnd));
        assert!(e.parked);
    }

    #[test]
    fn roster_lookup_by_id() {
        let update = RosterUpdate {
            tick:     Tick(3),
            entities: Arc::from(vec![
                TrackedEntity::new("A", LatLng::new(1.0, 1.0), 0.0),
                TrackedEntity::new("B", LatLng::new(2.0, 2.0), 0.0),
            ]),
        };
        assert_eq!(update.get("B").unwrap().position, LatLng::new(2.0, 2.0));
        assert!(update.get("C").is_none());
    }
}

//! Attendance admission: time window around the scheduled slot and an optional geofence around
//! the room.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::models::{GeoPoint, Lateness};

/// How early before the start a scan is accepted
pub const EARLY_MARGIN_MINUTES: i64 = 15;
/// Scans up to this long after the start still count as on time
pub const ON_TIME_MINUTES: i64 = 15;
/// How long after the end a scan is still accepted
pub const LATE_MARGIN_MINUTES: i64 = 30;

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum AttendanceRejection {
    #[error("too early")]
    TooEarly,
    #[error("too late")]
    TooLate,
    #[error("outside allowed radius ({distance_meters:.0} m away)")]
    OutsideRadius { distance_meters: f64 },
}

/// Classifies a scan against the window `[start - 15min, start + duration + 30min]`.
pub fn check_window(
    start: DateTime<Utc>,
    duration_minutes: u32,
    now: DateTime<Utc>,
) -> Result<Lateness, AttendanceRejection> {
    let opens = start - Duration::minutes(EARLY_MARGIN_MINUTES);
    let closes =
        start + Duration::minutes(i64::from(duration_minutes) + LATE_MARGIN_MINUTES);

    if now < opens {
        Err(AttendanceRejection::TooEarly)
    } else if now > closes {
        Err(AttendanceRejection::TooLate)
    } else if now <= start + Duration::minutes(ON_TIME_MINUTES) {
        Ok(Lateness::OnTime)
    } else {
        Ok(Lateness::Late)
    }
}

/// Great-circle distance in meters.
pub fn haversine_distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lon = (b.longitude - a.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (delta_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_METERS * h.sqrt().asin()
}

/// Returns the measured distance when both points are known.
///
/// A distance beyond the radius is only tolerated when a non-blank override reason is given.
pub fn check_geofence(
    claimed: Option<GeoPoint>,
    declared: Option<GeoPoint>,
    radius_meters: f64,
    override_reason: Option<&str>,
) -> Result<Option<f64>, AttendanceRejection> {
    let (claimed, declared) = match (claimed, declared) {
        (Some(claimed), Some(declared)) => (claimed, declared),
        _ => return Ok(None),
    };

    let distance_meters = haversine_distance(claimed, declared);
    let overridden = override_reason.map_or(false, |r| !r.trim().is_empty());

    if distance_meters > radius_meters && !overridden {
        Err(AttendanceRejection::OutsideRadius { distance_meters })
    } else {
        Ok(Some(distance_meters))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 14, 9, 0, 0).unwrap()
    }

    fn at(minutes: i64) -> DateTime<Utc> {
        start() + Duration::minutes(minutes)
    }

    const CAMPUS: GeoPoint = GeoPoint {
        latitude: -7.952_4,
        longitude: 112.613_6,
    };

    const LIBRARY: GeoPoint = GeoPoint {
        latitude: -7.950_1,
        longitude: 112.615_2,
    };

    #[test]
    fn fifteen_minutes_early_is_on_time() {
        assert_eq!(check_window(start(), 90, at(-15)), Ok(Lateness::OnTime));
    }

    #[test]
    fn sixteen_minutes_early_is_too_early() {
        assert_eq!(
            check_window(start(), 90, at(-16)),
            Err(AttendanceRejection::TooEarly)
        );
    }

    #[test]
    fn lateness_boundary() {
        assert_eq!(check_window(start(), 90, at(15)), Ok(Lateness::OnTime));
        assert_eq!(check_window(start(), 90, at(16)), Ok(Lateness::Late));
    }

    #[test]
    fn window_closes_thirty_minutes_after_the_end() {
        assert_eq!(check_window(start(), 90, at(90 + 30)), Ok(Lateness::Late));
        assert_eq!(
            check_window(start(), 90, at(90 + 31)),
            Err(AttendanceRejection::TooLate)
        );
    }

    #[test]
    fn distance_to_self_is_zero() {
        assert_eq!(haversine_distance(CAMPUS, CAMPUS), 0.0);
    }

    #[test]
    fn distance_is_plausible() {
        // Roughly 310 m between the two points
        let distance = haversine_distance(CAMPUS, LIBRARY);
        assert!(distance > 250.0 && distance < 350.0, "{}", distance);
        assert!((distance - haversine_distance(LIBRARY, CAMPUS)).abs() < 1e-6);
    }

    #[test]
    fn point_exactly_at_radius_is_accepted() {
        let radius = haversine_distance(CAMPUS, LIBRARY);
        let result = check_geofence(Some(LIBRARY), Some(CAMPUS), radius, None);
        assert_eq!(result, Ok(Some(radius)));
    }

    #[test]
    fn one_meter_beyond_radius_is_rejected() {
        let distance = haversine_distance(CAMPUS, LIBRARY);
        let result = check_geofence(Some(LIBRARY), Some(CAMPUS), distance - 1.0, None);
        assert_eq!(
            result,
            Err(AttendanceRejection::OutsideRadius {
                distance_meters: distance
            })
        );
    }

    #[test]
    fn override_reason_admits_distant_scan() {
        let distance = haversine_distance(CAMPUS, LIBRARY);

        let blank = check_geofence(Some(LIBRARY), Some(CAMPUS), 10.0, Some("  "));
        assert!(blank.is_err());

        let reason = check_geofence(Some(LIBRARY), Some(CAMPUS), 10.0, Some("GPS drift indoors"));
        assert_eq!(reason, Ok(Some(distance)));
    }

    #[test]
    fn no_geofence_without_both_points() {
        assert_eq!(check_geofence(None, Some(CAMPUS), 10.0, None), Ok(None));
        assert_eq!(check_geofence(Some(LIBRARY), None, 10.0, None), Ok(None));
    }
}

//! Conversions between Cartesian points and lane-relative (s, d) coordinates
//!
//! Lateral offset `d` is positive to the right of the lane direction.

use std::f64::consts::FRAC_PI_2;

use crate::common::{PlannerError, PlanningResult, Point2D, Pose2D, Waypoint};
use crate::frenet::lane::{Lane, LanePoint};
use crate::frenet::state::FrenetState;

/// Longitudinal speeds below this cannot be converted to a heading.
pub const MIN_LONGITUDINAL_SPEED: f64 = 1e-6;

/// Cartesian waypoint derived from a Frenet state plus the kinematic quantities
/// computed along the way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CartesianSample {
    pub waypoint: Waypoint,
    /// Lane heading minus waypoint heading [rad]
    pub heading_offset: f64,
    pub curvature: f64,
    pub acceleration: f64,
}

/// Map a Cartesian point to `(s, d)`.
///
/// The point is projected onto the segment between its nearest lane point and
/// that point's successor (or predecessor at the end of the lane).
pub fn cartesian_to_frenet(point: &Point2D, lane: &Lane) -> PlanningResult<(f64, f64)> {
    let (nearest_index, a, b) = lane.nearest_pair(point);
    let nearest = &lane.points()[nearest_index];

    let dx = b.position.x - a.position.x;
    let dy = b.position.y - a.position.y;
    let length = dx.hypot(dy);
    if length < f64::EPSILON {
        return Err(PlannerError::DegenerateGeometry(format!(
            "lane points around index {} are coincident",
            nearest_index
        )));
    }

    let cross = dx * (point.y - a.position.y) - dy * (point.x - a.position.x);
    let d = -cross / length;

    let along = (dx * (point.x - nearest.position.x) + dy * (point.y - nearest.position.y)) / length;
    let s = nearest.cumulated_s + along;
    Ok((s, d))
}

/// Frenet state at rest at the projection of `point`, moving with `speed`.
pub fn waypoint_to_frenet(point: &Point2D, speed: f64, lane: &Lane) -> PlanningResult<FrenetState> {
    let (s, d) = cartesian_to_frenet(point, lane)?;
    Ok(FrenetState::at(s, d, speed))
}

/// Walk `delta_s` along the heading of `lane_point`, then `d` to its right.
pub fn offset_from_lane_point(lane_point: &LanePoint, delta_s: f64, d: f64) -> Point2D {
    let yaw = lane_point.yaw;
    Point2D::new(
        lane_point.position.x + delta_s * yaw.cos() + d * (yaw - FRAC_PI_2).cos(),
        lane_point.position.y + delta_s * yaw.sin() + d * (yaw - FRAC_PI_2).sin(),
    )
}

/// Map `(s, d)` back to a Cartesian point.
pub fn frenet_to_cartesian(s: f64, d: f64, lane: &Lane) -> Point2D {
    let m = lane.nearest_by_s(s);
    offset_from_lane_point(m.point, m.delta_s, d)
}

/// Convert a sampled Frenet state into a waypoint with heading, speed,
/// curvature and acceleration consistent with the lane geometry.
pub fn frenet_state_to_waypoint(state: &FrenetState, lane: &Lane) -> PlanningResult<CartesianSample> {
    let s_velocity = state.s_state[1];
    if s_velocity.abs() < MIN_LONGITUDINAL_SPEED {
        return Err(PlannerError::DegenerateGeometry(format!(
            "longitudinal speed {:.3e} at s = {:.3} is too small to derive a heading",
            s_velocity, state.s_state[0]
        )));
    }
    let d = state.d_state[0];
    let d_velocity = state.d_state[1];
    let d_dash = d_velocity / s_velocity;
    let m = lane.nearest_by_s(state.s_state[0]);
    let kd = one_minus_kappa_d(m.point, d)?;
    let heading_offset = (d_dash / kd).atan();
    Ok(build_sample(state, m.point, m.delta_s, heading_offset, Some(d_dash)))
}

/// Like `frenet_state_to_waypoint` but with a fixed heading offset, for
/// states whose longitudinal speed is too small to derive one.
pub fn frenet_state_to_waypoint_with_heading(
    state: &FrenetState,
    lane: &Lane,
    heading_offset: f64,
) -> PlanningResult<CartesianSample> {
    let m = lane.nearest_by_s(state.s_state[0]);
    one_minus_kappa_d(m.point, state.d_state[0])?;
    Ok(build_sample(state, m.point, m.delta_s, heading_offset, None))
}

fn one_minus_kappa_d(lane_point: &LanePoint, d: f64) -> PlanningResult<f64> {
    let kd = 1.0 - lane_point.curvature * d;
    if kd.abs() < MIN_LONGITUDINAL_SPEED {
        return Err(PlannerError::DegenerateGeometry(format!(
            "lateral offset {:.3} reaches the curvature centre at s = {:.3}",
            d, lane_point.cumulated_s
        )));
    }
    Ok(kd)
}

fn build_sample(
    state: &FrenetState,
    lane_point: &LanePoint,
    delta_s: f64,
    heading_offset: f64,
    d_dash: Option<f64>,
) -> CartesianSample {
    let (s_velocity, s_acceleration) = (state.s_state[1], state.s_state[2]);
    let (d, d_velocity, d_acceleration) = (state.d_state[0], state.d_state[1], state.d_state[2]);
    let kappa = lane_point.curvature;
    let kappa_rate = lane_point.curvature_rate;
    let kd = 1.0 - kappa * d;

    let velocity = (kd.powi(2) * s_velocity.powi(2) + d_velocity.powi(2)).sqrt();
    let cos_offset = heading_offset.cos();
    let tan_offset = heading_offset.tan();

    let (curvature, acceleration) = match d_dash {
        Some(d_dash) => {
            let d_double_dash = (d_acceleration - s_acceleration * d_dash) / (s_velocity * s_velocity);
            let curvature = cos_offset.powi(3) / kd.powi(2)
                * (d_double_dash
                    + (kappa_rate * d + kappa * d_velocity) * tan_offset
                    + kd / cos_offset.powi(2) * kappa);
            let acceleration = s_acceleration * kd / cos_offset
                + s_velocity * s_velocity / cos_offset
                    * (kd * tan_offset * (curvature * kd / cos_offset - kappa)
                        + (kappa_rate * d + kappa * d_velocity));
            (curvature, acceleration)
        }
        // held heading: follow the lane
        None => (kappa, s_acceleration * kd / cos_offset),
    };

    let position = offset_from_lane_point(lane_point, delta_s, d);
    let yaw = lane_point.yaw - heading_offset;
    CartesianSample {
        waypoint: Waypoint {
            pose: Pose2D::new(position.x, position.y, yaw),
            z: 0.0,
            velocity,
        },
        heading_offset,
        curvature,
        acceleration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector4;

    fn straight_lane() -> Lane {
        Lane::straight(Point2D::origin(), 0.0, 100, 1.0).unwrap()
    }

    #[test]
    fn test_sign_convention() {
        let lane = straight_lane();
        let (s, d) = cartesian_to_frenet(&Point2D::new(10.4, 2.0), &lane).unwrap();
        assert!((s - 10.4).abs() < 1e-9);
        // left of a +x lane is negative
        assert!((d + 2.0).abs() < 1e-9);

        let p = frenet_to_cartesian(10.4, -2.0, &lane);
        assert!((p.x - 10.4).abs() < 1e-9);
        assert!((p.y - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_projection_at_lane_end() {
        let lane = straight_lane();
        let (s, d) = cartesian_to_frenet(&Point2D::new(101.0, -1.0), &lane).unwrap();
        assert!((s - 101.0).abs() < 1e-9);
        assert!((d - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_coincident_lane_points() {
        let mut points = Vec::new();
        for i in 0..4 {
            // cumulated_s is increasing but two points share a position
            let x = if i == 2 { 1.0 } else { i as f64 };
            points.push(LanePoint::new(i as f64, x, 0.0, 0.0, 0.0));
        }
        let lane = Lane::new(points).unwrap();
        let result = cartesian_to_frenet(&Point2D::new(1.0, 0.5), &lane);
        assert!(matches!(result, Err(PlannerError::DegenerateGeometry(_))));
    }

    #[test]
    fn test_state_to_waypoint_straight() {
        let lane = straight_lane();
        let state = FrenetState::new(
            Vector4::new(20.0, 4.0, 0.0, 0.0),
            Vector4::new(1.0, 3.0, 0.0, 0.0),
        );
        let sample = frenet_state_to_waypoint(&state, &lane).unwrap();
        assert!((sample.waypoint.velocity - 5.0).abs() < 1e-9);
        // drifting right turns the heading clockwise
        assert!((sample.waypoint.pose.yaw + (0.75f64).atan()).abs() < 1e-9);
        assert!((sample.waypoint.pose.x - 20.0).abs() < 1e-9);
        assert!((sample.waypoint.pose.y + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_state_to_waypoint_on_arc() {
        let radius = 50.0;
        let polyline: Vec<Point2D> = (0..200)
            .map(|i| {
                let theta = i as f64 * 0.01;
                Point2D::new(radius * theta.sin(), radius * (1.0 - theta.cos()))
            })
            .collect();
        let lane = Lane::from_polyline(&polyline).unwrap();
        // following the lane at a constant offset keeps the lane heading
        let state = FrenetState::at(40.0, 0.0, 10.0);
        let sample = frenet_state_to_waypoint(&state, &lane).unwrap();
        let lane_yaw = lane.nearest_by_s(40.0).point.yaw;
        assert!((sample.waypoint.pose.yaw - lane_yaw).abs() < 1e-9);
        assert!((sample.curvature - 1.0 / radius).abs() < 1e-3);
        assert!((sample.waypoint.velocity - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_speed_is_degenerate() {
        let lane = straight_lane();
        let state = FrenetState::at(10.0, 0.0, 0.0);
        assert!(matches!(
            frenet_state_to_waypoint(&state, &lane),
            Err(PlannerError::DegenerateGeometry(_))
        ));
        let held = frenet_state_to_waypoint_with_heading(&state, &lane, 0.1).unwrap();
        assert!((held.waypoint.pose.yaw + 0.1).abs() < 1e-12);
        assert_eq!(held.waypoint.velocity, 0.0);
    }
}

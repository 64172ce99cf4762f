//! Reference lane geometry
//!
//! A `Lane` is the ordered, arc-length indexed centerline the Frenet frame is
//! anchored to. It is produced outside the planner and read-only here.

use serde::{Deserialize, Serialize};

use crate::common::{normalize_angle, PlannerError, PlanningResult, Point2D};

/// One sample of the reference lane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LanePoint {
    /// Cumulative arc length from the first lane point [m]
    pub cumulated_s: f64,
    pub position: Point2D,
    /// Heading [rad]
    pub yaw: f64,
    /// Curvature [1/m]
    pub curvature: f64,
    /// Derivative of curvature with respect to arc length [1/m^2]
    pub curvature_rate: f64,
}

impl LanePoint {
    pub fn new(cumulated_s: f64, x: f64, y: f64, yaw: f64, curvature: f64) -> Self {
        Self {
            cumulated_s,
            position: Point2D::new(x, y),
            yaw,
            curvature,
            curvature_rate: 0.0,
        }
    }
}

/// Lane point closest in arc length to a query `s`
#[derive(Debug, Clone, Copy)]
pub struct ArcLengthMatch<'a> {
    pub point: &'a LanePoint,
    /// `s - point.cumulated_s`
    pub delta_s: f64,
}

/// Ordered reference lane with strictly increasing arc length
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lane {
    points: Vec<LanePoint>,
}

impl Lane {
    /// Wrap lane points, checking the arc-length invariant.
    pub fn new(points: Vec<LanePoint>) -> PlanningResult<Self> {
        if points.len() < 2 {
            return Err(PlannerError::InvalidInput(format!(
                "lane needs at least 2 points, got {}",
                points.len()
            )));
        }
        if let Some(i) = points
            .windows(2)
            .position(|w| w[1].cumulated_s <= w[0].cumulated_s)
        {
            return Err(PlannerError::InvalidInput(format!(
                "cumulated_s is not strictly increasing at lane point {}",
                i + 1
            )));
        }
        Ok(Self { points })
    }

    /// Build a lane from a polyline, deriving arc length, heading, curvature
    /// and curvature rate by finite differences.
    pub fn from_polyline(polyline: &[Point2D]) -> PlanningResult<Self> {
        let n = polyline.len();
        if n < 2 {
            return Err(PlannerError::InvalidInput(format!(
                "polyline needs at least 2 points, got {}",
                n
            )));
        }

        let mut s = Vec::with_capacity(n);
        s.push(0.0);
        for w in polyline.windows(2) {
            let last = s[s.len() - 1];
            s.push(last + w[0].distance(&w[1]));
        }

        let yaw: Vec<f64> = (0..n)
            .map(|i| {
                let (a, b) = if i + 1 < n {
                    (polyline[i], polyline[i + 1])
                } else {
                    (polyline[i - 1], polyline[i])
                };
                (b.y - a.y).atan2(b.x - a.x)
            })
            .collect();

        let mut curvature = vec![0.0; n];
        for i in 1..n - 1 {
            let ds = s[i + 1] - s[i - 1];
            if ds > 0.0 {
                curvature[i] = normalize_angle(yaw[i] - yaw[i - 1]) / (0.5 * ds);
            }
        }
        curvature[0] = curvature.get(1).copied().unwrap_or(0.0);
        curvature[n - 1] = curvature[n - 2];

        let mut curvature_rate = vec![0.0; n];
        for i in 1..n - 1 {
            let ds = s[i + 1] - s[i - 1];
            if ds > 0.0 {
                curvature_rate[i] = (curvature[i + 1] - curvature[i - 1]) / ds;
            }
        }

        let points = (0..n)
            .map(|i| LanePoint {
                cumulated_s: s[i],
                position: polyline[i],
                yaw: yaw[i],
                curvature: curvature[i],
                curvature_rate: curvature_rate[i],
            })
            .collect();
        Self::new(points)
    }

    /// Straight lane along `yaw` starting at `start`, `num_points` samples `spacing` apart.
    pub fn straight(start: Point2D, yaw: f64, num_points: usize, spacing: f64) -> PlanningResult<Self> {
        if spacing <= 0.0 {
            return Err(PlannerError::InvalidParameter(format!(
                "lane spacing must be positive, got {}",
                spacing
            )));
        }
        let (sin, cos) = yaw.sin_cos();
        let points = (0..num_points)
            .map(|i| {
                let s = i as f64 * spacing;
                LanePoint::new(s, start.x + s * cos, start.y + s * sin, yaw, 0.0)
            })
            .collect();
        Self::new(points)
    }

    pub fn points(&self) -> &[LanePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn total_length(&self) -> f64 {
        self.points.last().map(|p| p.cumulated_s).unwrap_or(0.0)
    }

    /// Index of the lane point closest to `point`. The first minimum wins.
    pub fn nearest_index(&self, point: &Point2D) -> usize {
        let mut best = 0;
        let mut min_dist = f64::INFINITY;
        for (i, lp) in self.points.iter().enumerate() {
            let d = lp.position.distance(point);
            if d < min_dist {
                min_dist = d;
                best = i;
            }
        }
        best
    }

    /// The nearest lane point and its neighbour, ordered by increasing arc length.
    /// The neighbour is the successor, or the predecessor at the end of the lane.
    pub fn nearest_pair(&self, point: &Point2D) -> (usize, &LanePoint, &LanePoint) {
        let i = self.nearest_index(point);
        if i + 1 < self.points.len() {
            (i, &self.points[i], &self.points[i + 1])
        } else {
            (i, &self.points[i - 1], &self.points[i])
        }
    }

    /// Lane point minimising `|s - cumulated_s|`, with the signed residual.
    pub fn nearest_by_s(&self, s: f64) -> ArcLengthMatch<'_> {
        // first point whose arc length is not below s
        let upper = self.points.partition_point(|p| p.cumulated_s < s);
        let idx = if upper == 0 {
            0
        } else if upper >= self.points.len() {
            self.points.len() - 1
        } else {
            let below = &self.points[upper - 1];
            let above = &self.points[upper];
            if (s - below.cumulated_s).abs() <= (above.cumulated_s - s).abs() {
                upper - 1
            } else {
                upper
            }
        };
        let point = &self.points[idx];
        ArcLengthMatch {
            point,
            delta_s: s - point.cumulated_s,
        }
    }
}

//! Closed-form boundary-value polynomials
//!
//! Lateral offset follows a quintic in time. Longitudinal motion is fit as a
//! quartic whose derivative is the speed profile; the target arc length is
//! left free and position is integrated by the trajectory generator.

use nalgebra::{Matrix2, Matrix3, Vector2, Vector3};

use crate::common::{PlannerError, PlanningResult};

/// Quintic polynomial matching position, velocity and acceleration at both ends
#[derive(Debug, Clone)]
pub struct QuinticPolynomial {
    pub a0: f64,
    pub a1: f64,
    pub a2: f64,
    pub a3: f64,
    pub a4: f64,
    pub a5: f64,
}

impl QuinticPolynomial {
    /// `start`/`end` are `(position, velocity, acceleration)`.
    pub fn new(start: (f64, f64, f64), end: (f64, f64, f64), time: f64) -> PlanningResult<Self> {
        check_horizon(time)?;
        let (xs, vxs, axs) = start;
        let (xe, vxe, axe) = end;
        let a0 = xs;
        let a1 = vxs;
        let a2 = axs / 2.0;

        let t2 = time * time;
        let t3 = t2 * time;
        let t4 = t3 * time;
        let t5 = t4 * time;

        let a = Matrix3::new(
            t3, t4, t5,
            3.0 * t2, 4.0 * t3, 5.0 * t4,
            6.0 * time, 12.0 * t2, 20.0 * t3,
        );
        let b = Vector3::new(
            xe - a0 - a1 * time - a2 * t2,
            vxe - a1 - 2.0 * a2 * time,
            axe - 2.0 * a2,
        );
        let x = a
            .try_inverse()
            .map(|inv| inv * b)
            .ok_or_else(|| singular(time))?;

        Ok(QuinticPolynomial {
            a0,
            a1,
            a2,
            a3: x[0],
            a4: x[1],
            a5: x[2],
        })
    }

    pub fn calc_point(&self, t: f64) -> f64 {
        self.a0 + self.a1 * t + self.a2 * t.powi(2) + self.a3 * t.powi(3) + self.a4 * t.powi(4) + self.a5 * t.powi(5)
    }

    pub fn calc_first_derivative(&self, t: f64) -> f64 {
        self.a1 + 2.0 * self.a2 * t + 3.0 * self.a3 * t.powi(2) + 4.0 * self.a4 * t.powi(3) + 5.0 * self.a5 * t.powi(4)
    }

    pub fn calc_second_derivative(&self, t: f64) -> f64 {
        2.0 * self.a2 + 6.0 * self.a3 * t + 12.0 * self.a4 * t.powi(2) + 20.0 * self.a5 * t.powi(3)
    }

    pub fn calc_third_derivative(&self, t: f64) -> f64 {
        6.0 * self.a3 + 24.0 * self.a4 * t + 60.0 * self.a5 * t.powi(2)
    }
}

/// Quartic polynomial matching velocity and acceleration at both ends
#[derive(Debug, Clone)]
pub struct QuarticPolynomial {
    pub a0: f64,
    pub a1: f64,
    pub a2: f64,
    pub a3: f64,
    pub a4: f64,
}

impl QuarticPolynomial {
    /// `start` is `(position, velocity, acceleration)`, `end` is `(velocity, acceleration)`.
    pub fn new(start: (f64, f64, f64), end: (f64, f64), time: f64) -> PlanningResult<Self> {
        check_horizon(time)?;
        let (xs, vxs, axs) = start;
        let (vxe, axe) = end;
        let a0 = xs;
        let a1 = vxs;
        let a2 = axs / 2.0;

        let t2 = time * time;
        let t3 = t2 * time;

        let a = Matrix2::new(
            3.0 * t2, 4.0 * t3,
            6.0 * time, 12.0 * t2,
        );
        let b = Vector2::new(vxe - a1 - 2.0 * a2 * time, axe - 2.0 * a2);
        let x = a
            .try_inverse()
            .map(|inv| inv * b)
            .ok_or_else(|| singular(time))?;

        Ok(QuarticPolynomial {
            a0,
            a1,
            a2,
            a3: x[0],
            a4: x[1],
        })
    }

    pub fn calc_point(&self, t: f64) -> f64 {
        self.a0 + self.a1 * t + self.a2 * t.powi(2) + self.a3 * t.powi(3) + self.a4 * t.powi(4)
    }

    pub fn calc_first_derivative(&self, t: f64) -> f64 {
        self.a1 + 2.0 * self.a2 * t + 3.0 * self.a3 * t.powi(2) + 4.0 * self.a4 * t.powi(3)
    }

    pub fn calc_second_derivative(&self, t: f64) -> f64 {
        2.0 * self.a2 + 6.0 * self.a3 * t + 12.0 * self.a4 * t.powi(2)
    }

    pub fn calc_third_derivative(&self, t: f64) -> f64 {
        6.0 * self.a3 + 24.0 * self.a4 * t
    }
}

fn check_horizon(time: f64) -> PlanningResult<()> {
    if time > 0.0 && time.is_finite() {
        Ok(())
    } else {
        Err(PlannerError::InvalidParameter(format!(
            "time horizon must be positive, got {}",
            time
        )))
    }
}

fn singular(time: f64) -> PlannerError {
    PlannerError::DegenerateGeometry(format!(
        "boundary-value system is singular for horizon {}",
        time
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quintic_boundary_conditions() {
        let t = 7.0;
        let p = QuinticPolynomial::new((1.0, 0.5, -0.2), (-3.0, 0.0, 0.1), t).unwrap();

        assert!((p.calc_point(0.0) - 1.0).abs() < 1e-9);
        assert!((p.calc_first_derivative(0.0) - 0.5).abs() < 1e-9);
        assert!((p.calc_second_derivative(0.0) + 0.2).abs() < 1e-9);

        assert!((p.calc_point(t) + 3.0).abs() < 1e-6);
        assert!(p.calc_first_derivative(t).abs() < 1e-6);
        assert!((p.calc_second_derivative(t) - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_quartic_velocity_boundary_conditions() {
        let t = 10.0;
        let p = QuarticPolynomial::new((0.0, 5.0, 0.0), (1.0, 0.0), t).unwrap();

        assert!((p.calc_first_derivative(0.0) - 5.0).abs() < 1e-9);
        assert!((p.calc_first_derivative(t) - 1.0).abs() < 1e-6);
        assert!(p.calc_second_derivative(t).abs() < 1e-6);
        // jerk is linear in time
        let j0 = p.calc_third_derivative(0.0);
        let j1 = p.calc_third_derivative(1.0);
        let j2 = p.calc_third_derivative(2.0);
        assert!(((j2 - j1) - (j1 - j0)).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_non_positive_horizon() {
        assert!(QuinticPolynomial::new((0.0, 0.0, 0.0), (1.0, 0.0, 0.0), 0.0).is_err());
        assert!(QuarticPolynomial::new((0.0, 0.0, 0.0), (1.0, 0.0), -1.0).is_err());
    }
}

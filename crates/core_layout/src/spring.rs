//! Closed-form damped spring.
//!
//! Solves `m·x'' + b·x' + k·x = k·to` analytically, so the value at any
//! wall-clock time is a pure function of the spring's parameters. Nothing is
//! integrated frame by frame, which keeps animations independent of the tick
//! rate.

/// Step used for the numerical velocity estimate, in seconds.
///
/// `is_done` compares the estimated velocity against `epsilon`, so this step
/// shifts the exact settle moment by a fraction of a millisecond.
pub const VELOCITY_STEP: f64 = 0.001;

/// Physical parameters of a spring with unit mass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringParams {
    pub damping: f64,
    pub mass: f64,
    pub stiffness: f64,
    pub epsilon: f64,
}

impl SpringParams {
    /// Build parameters from a damping ratio (1.0 = critically damped).
    pub fn new(damping_ratio: f64, stiffness: f64, epsilon: f64) -> Self {
        let mass = 1.0;
        let stiffness = stiffness.max(0.0);
        let critical_damping = 2.0 * (mass * stiffness).sqrt();

        Self {
            damping: damping_ratio * critical_damping,
            mass,
            stiffness,
            epsilon: epsilon.max(0.0),
        }
    }

    /// Slightly underdamped preset for inertial motion of the view.
    pub fn responsive() -> Self {
        Self::new(0.85, 1200.0, 0.001)
    }

    /// Critically damped, stiff preset for click-into-place snapping.
    pub fn sticky() -> Self {
        Self::new(1.0, 1500.0, 0.001)
    }

    /// Preset for window frame transitions; settles at pixel precision.
    pub fn window_frame() -> Self {
        Self::new(0.85, 600.0, 0.5)
    }

    /// Pick the view preset.
    pub fn for_view(sticky: bool) -> Self {
        if sticky {
            Self::sticky()
        } else {
            Self::responsive()
        }
    }
}

/// An immutable spring animation from `from` to `to`, started at `start_time`.
///
/// Times are seconds on the same monotonic clock the caller uses everywhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spring {
    pub from: f64,
    pub to: f64,
    pub initial_velocity: f64,
    pub params: SpringParams,
    pub start_time: f64,
}

impl Spring {
    pub fn new(from: f64, to: f64, initial_velocity: f64, params: SpringParams, start_time: f64) -> Self {
        Self {
            from,
            to,
            initial_velocity,
            params,
            start_time,
        }
    }

    /// Position at wall-clock time `now`.
    pub fn value_at(&self, now: f64) -> f64 {
        self.oscillate(now - self.start_time)
    }

    /// Forward-difference velocity at `now`, using [`VELOCITY_STEP`].
    pub fn velocity_at(&self, now: f64) -> f64 {
        let t = now - self.start_time;
        let x1 = self.oscillate(t);
        let x2 = self.oscillate(t + VELOCITY_STEP);
        (x2 - x1) / VELOCITY_STEP
    }

    /// Whether the spring has settled within `epsilon` in both position and
    /// velocity.
    pub fn is_done(&self, now: f64) -> bool {
        let epsilon = self.params.epsilon;
        (self.value_at(now) - self.to).abs() < epsilon && self.velocity_at(now).abs() < epsilon
    }

    fn oscillate(&self, t: f64) -> f64 {
        if t <= 0.0 {
            return self.from;
        }

        let SpringParams {
            damping: b,
            mass: m,
            stiffness: k,
            ..
        } = self.params;
        let v0 = self.initial_velocity;

        let beta = b / (2.0 * m);
        let omega0 = (k / m).sqrt();
        let x0 = self.from - self.to;

        if (beta - omega0).abs() <= f64::EPSILON {
            // Critically damped.
            let envelope = (-beta * t).exp();
            self.to + envelope * (x0 + (beta * x0 + v0) * t)
        } else if beta < omega0 {
            // Underdamped.
            let omega1 = (omega0 * omega0 - beta * beta).sqrt();
            let envelope = (-beta * t).exp();
            self.to
                + envelope
                    * (x0 * (omega1 * t).cos() + ((beta * x0 + v0) / omega1) * (omega1 * t).sin())
        } else {
            // Overdamped. e^(-βt)·cosh(ω2·t) and e^(-βt)·sinh(ω2·t) are
            // expanded into their two decaying exponentials; the naive product
            // overflows to inf·0 for long-running springs.
            let omega2 = (beta * beta - omega0 * omega0).sqrt();
            let slow = ((omega2 - beta) * t).exp();
            let fast = ((-omega2 - beta) * t).exp();
            let cosh_env = (slow + fast) / 2.0;
            let sinh_env = (slow - fast) / 2.0;
            self.to + x0 * cosh_env + ((beta * x0 + v0) / omega2) * sinh_env
        }
    }
}

use derive_builder::Builder;
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, trace, warn};

use super::{Action, Environment, Observation, StepInfo, StepOutcome};

/// Physical constants and limits of the cart-pole system.
///
/// The defaults reproduce the classic `CartPole-v1` task: a pole hinged on a
/// cart, pushed left or right with a fixed force, failing once the pole tips
/// past 12 degrees or the cart leaves the track.
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(default)]
pub struct CartPoleParams {
    pub gravity: f64,
    pub mass_cart: f64,
    pub mass_pole: f64,
    /// Half of the pole length.
    pub length: f64,
    pub force_mag: f64,
    /// Seconds between state updates.
    pub tau: f64,
    pub x_threshold: f64,
    pub theta_threshold: f64,
    /// Steps after which the episode is truncated.
    pub time_limit: usize,
}

impl Default for CartPoleParams {
    fn default() -> Self {
        Self {
            gravity: 9.8,
            mass_cart: 1.0,
            mass_pole: 0.1,
            length: 0.5,
            force_mag: 10.0,
            tau: 0.02,
            x_threshold: 2.4,
            theta_threshold: 12.0 * 2.0 * std::f64::consts::PI / 360.0,
            time_limit: 500,
        }
    }
}

impl CartPoleParams {
    fn total_mass(&self) -> f64 {
        self.mass_pole + self.mass_cart
    }

    fn pole_mass_length(&self) -> f64 {
        self.mass_pole * self.length
    }
}

pub struct CartPole {
    params: CartPoleParams,
    rng: StdRng,
    state: Observation,
    elapsed: usize,
    /// Steps taken after the episode already ended.
    steps_beyond_done: Option<usize>,
    render: bool,
    closed: bool,
}

impl CartPole {
    pub fn new(params: CartPoleParams, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            params,
            rng,
            state: [0.0; 4],
            elapsed: 0,
            steps_beyond_done: None,
            render: false,
            closed: false,
        }
    }

    /// Enables or disables text rendering of each frame.
    pub fn with_render(mut self, render: bool) -> Self {
        self.render = render;
        self
    }

    /// Overrides the current state. Mainly useful for tests.
    pub fn set_state(&mut self, state: Observation) {
        self.state = state;
        self.elapsed = 0;
        self.steps_beyond_done = None;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn failed(&self) -> bool {
        let [x, _, theta, _] = self.state;
        x < -self.params.x_threshold
            || x > self.params.x_threshold
            || theta < -self.params.theta_threshold
            || theta > self.params.theta_threshold
    }

    fn integrate(&mut self, action: Action) {
        let p = &self.params;
        let [x, x_dot, theta, theta_dot] = self.state;
        let force = match action {
            Action::Right => p.force_mag,
            Action::Left => -p.force_mag,
        };
        let cos_theta = theta.cos();
        let sin_theta = theta.sin();

        let temp =
            (force + p.pole_mass_length() * theta_dot * theta_dot * sin_theta) / p.total_mass();
        let theta_acc = (p.gravity * sin_theta - cos_theta * temp)
            / (p.length * (4.0 / 3.0 - p.mass_pole * cos_theta * cos_theta / p.total_mass()));
        let x_acc = temp - p.pole_mass_length() * theta_acc * cos_theta / p.total_mass();

        self.state = [
            x + p.tau * x_dot,
            x_dot + p.tau * x_acc,
            theta + p.tau * theta_dot,
            theta_dot + p.tau * theta_acc,
        ];
    }
}

impl Environment for CartPole {
    fn reset(&mut self) -> Observation {
        for value in self.state.iter_mut() {
            *value = self.rng.gen_range(-0.05..0.05);
        }
        self.elapsed = 0;
        self.steps_beyond_done = None;
        self.state
    }

    fn step(&mut self, action: Action) -> StepOutcome {
        self.integrate(action);
        self.elapsed += 1;

        let terminated = self.failed();
        let truncated = !terminated && self.elapsed >= self.params.time_limit;
        let done = terminated || truncated;

        let reward = if let Some(beyond) = self.steps_beyond_done.as_mut() {
            if *beyond == 0 {
                warn!("step() called after the episode finished; call reset() first");
            }
            *beyond += 1;
            0.0
        } else {
            if done {
                self.steps_beyond_done = Some(0);
            }
            1.0
        };

        StepOutcome {
            observation: self.state,
            reward,
            done,
            info: StepInfo {
                step: self.elapsed,
                truncated,
            },
        }
    }

    fn render(&mut self) {
        if !self.render {
            return;
        }
        let [x, _, theta, _] = self.state;
        // 41 columns covering the track [-x_threshold, x_threshold]
        let width = 41usize;
        let span = 2.0 * self.params.x_threshold;
        let ratio = ((x + self.params.x_threshold) / span).clamp(0.0, 1.0);
        let col = (ratio * (width - 1) as f64).round() as usize;
        let pole = match theta {
            t if t < -0.05 => '\\',
            t if t > 0.05 => '/',
            _ => '|',
        };
        let frame: String = (0..width)
            .map(|i| if i == col { pole } else { '_' })
            .collect();
        trace!(step = self.elapsed, "{} x={:+.3} theta={:+.3}", frame, x, theta);
    }

    fn close(&mut self) {
        if !self.closed {
            debug!("Closing cart-pole environment");
            self.closed = true;
        }
    }
}

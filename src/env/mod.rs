use std::fmt;

pub mod cartpole;

/// Number of values in an observation: cart position, cart velocity, pole angle
/// and pole angular velocity.
pub const OBSERVATION_SIZE: usize = 4;

pub type Observation = [f64; OBSERVATION_SIZE];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Left,
    Right,
}

impl Action {
    /// Binarises a continuous decision value against a threshold.
    pub fn from_decision(decision: f64, threshold: f64) -> Self {
        if decision < threshold {
            Action::Left
        } else {
            Action::Right
        }
    }
}

impl From<Action> for u8 {
    fn from(action: Action) -> Self {
        match action {
            Action::Left => 0,
            Action::Right => 1,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepInfo {
    /// Index of the step within the current episode, starting at 1.
    pub step: usize,
    /// The episode ended because of the time limit rather than a failure.
    pub truncated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub observation: Observation,
    pub reward: f64,
    pub done: bool,
    pub info: StepInfo,
}

/// A simulation the agent can act in.
pub trait Environment {
    fn reset(&mut self) -> Observation;

    fn step(&mut self, action: Action) -> StepOutcome;

    fn render(&mut self);

    fn close(&mut self);
}

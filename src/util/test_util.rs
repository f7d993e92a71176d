use std::path::Path;
use tracing::subscriber::set_default;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;

use crate::env::{Action, Environment, Observation, StepInfo, StepOutcome};

pub struct TracingGuards {
    _subscriber_guard: tracing::subscriber::DefaultGuard,
    _worker_guard: WorkerGuard,
}

pub fn setup_test_tracing(test_name: &str) -> TracingGuards {
    let log_dir = Path::new("tests/logs");
    if !log_dir.exists() {
        std::fs::create_dir_all(log_dir).unwrap();
    }

    let log_file = format!("tests/logs/{}.log", test_name);
    let file_appender = tracing_appender::rolling::never("", &log_file);
    let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = fmt::Subscriber::builder()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_level(true)
        .with_target(true)
        .with_max_level(tracing::Level::TRACE)
        .finish();

    // Default for this thread only, so parallel tests keep separate logs
    let subscriber_guard = set_default(subscriber);

    TracingGuards {
        _subscriber_guard: subscriber_guard,
        _worker_guard: worker_guard,
    }
}

/// An environment that replays fixed observations and pays 1.0 per step.
///
/// Observations cycle: `reset` returns the first one and step `n` returns
/// `observations[n % len]`.
#[derive(Debug, Clone)]
pub struct ScriptedEnvironment {
    observations: Vec<Observation>,
    reward_steps: Option<usize>,
    done_after: Option<usize>,
    step: usize,
    pub actions: Vec<Action>,
    pub resets: usize,
    pub renders: usize,
    pub closes: usize,
}

impl ScriptedEnvironment {
    pub fn new(observations: Vec<Observation>) -> Self {
        assert!(!observations.is_empty(), "need at least one observation");
        Self {
            observations,
            reward_steps: None,
            done_after: None,
            step: 0,
            actions: Vec::new(),
            resets: 0,
            renders: 0,
            closes: 0,
        }
    }

    /// Only the first `steps` steps of an episode pay a reward.
    pub fn reward_for(mut self, steps: usize) -> Self {
        self.reward_steps = Some(steps);
        self
    }

    /// Reports `done` on step `steps` of every episode.
    pub fn done_after(mut self, steps: usize) -> Self {
        self.done_after = Some(steps);
        self
    }
}

impl Environment for ScriptedEnvironment {
    fn reset(&mut self) -> Observation {
        self.step = 0;
        self.resets += 1;
        self.observations[0]
    }

    fn step(&mut self, action: Action) -> StepOutcome {
        self.actions.push(action);
        self.step += 1;
        let observation = self.observations[self.step % self.observations.len()];
        let reward = match self.reward_steps {
            Some(limit) if self.step > limit => 0.0,
            _ => 1.0,
        };
        let done = self.done_after.is_some_and(|n| self.step >= n);
        StepOutcome {
            observation,
            reward,
            done,
            info: StepInfo {
                step: self.step,
                truncated: false,
            },
        }
    }

    fn render(&mut self) {
        self.renders += 1;
    }

    fn close(&mut self) {
        self.closes += 1;
    }
}

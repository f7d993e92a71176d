use std::fmt;

use rand::{rngs::StdRng, Rng};
use tracing::{debug, info, instrument, warn};

use crate::{
    agent::{
        best::BestRecord,
        decision::{DecisionSpectrum, DecisionStats},
        report::{EpisodeSummary, RunReport},
        strategy::Strategy,
    },
    config::AgentConfig,
    env::{Action, Environment},
    error::SearchError,
    persistence::{Confirm, PersistedConfig, StateStore},
};

/// Steps between progress messages within an episode.
const PROGRESS_INTERVAL: usize = 100;

/// Random search over linear strategies for a balancing task.
///
/// Training episodes each try a freshly sampled [`Strategy`], keeping the one
/// with the best score. While training, every decision value widens the
/// [`DecisionSpectrum`] and the action threshold follows its midpoint.
pub struct StrategySearchAgent<E: Environment, R: Rng = StdRng> {
    env: E,
    rng: R,
    store: StateStore,
    max_steps: usize,
    max_score: f64,
    stats: DecisionStats,
    best: BestRecord,
    /// The state read by the last successful `load_config`, or written by the
    /// last save.
    loaded: Option<PersistedConfig>,
    history: Vec<EpisodeSummary>,
}

impl<E: Environment, R: Rng> fmt::Debug for StrategySearchAgent<E, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StrategySearchAgent {{ stats: {:?}, best: {:?}, episodes: {} }}",
            self.stats,
            self.best,
            self.history.len()
        )
    }
}

impl<E: Environment, R: Rng> StrategySearchAgent<E, R> {
    pub fn new(env: E, rng: R, config: &AgentConfig) -> Self {
        Self {
            env,
            rng,
            store: StateStore::new(&config.state_file),
            max_steps: config.max_steps,
            max_score: config.max_score,
            stats: DecisionStats::default(),
            best: BestRecord::default(),
            loaded: None,
            history: Vec::new(),
        }
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn high_score(&self) -> f64 {
        self.best.high_score()
    }

    pub fn best_strategy(&self) -> Option<Strategy> {
        self.best.best_strategy()
    }

    pub fn spectrum(&self) -> DecisionSpectrum {
        self.stats.spectrum()
    }

    pub fn threshold(&self) -> f64 {
        self.stats.threshold()
    }

    pub fn history(&self) -> &[EpisodeSummary] {
        &self.history
    }

    /// Runs one episode and returns its score.
    ///
    /// Training samples a new strategy, adapts the threshold as it goes and may
    /// replace the best record. Evaluation replays the best strategy and
    /// leaves all state untouched.
    #[instrument(level = "debug", skip(self), fields(episode = self.history.len()))]
    pub fn run_episode(&mut self, train: bool) -> Result<f64, SearchError> {
        let mut observation = self.env.reset();
        let strategy = if train {
            Strategy::random(&mut self.rng)
        } else {
            self.best.best_strategy().ok_or(SearchError::NoBestStrategy)?
        };

        let mut score = 0.0;
        let mut steps = 0;
        for i in 1..=self.max_steps {
            self.env.render();

            let decision = strategy.decide(&observation);
            let action = Action::from_decision(decision, self.stats.threshold());

            if train {
                self.update_decision_stats(decision);
            }

            let outcome = self.env.step(action);
            observation = outcome.observation;
            score += outcome.reward;
            steps = i;

            if i % PROGRESS_INTERVAL == 0 {
                debug!("Reached {} steps!", i);
            }

            if outcome.done {
                break;
            }
        }

        let improved = train && self.best.consider(score, strategy, self.max_score);
        if improved {
            info!(
                "New high score ({}) achieved with strategy - {}",
                score, strategy
            );
        }

        let summary = EpisodeSummary {
            episode: self.history.len(),
            train,
            score,
            steps,
            high_score: self.best.high_score(),
            spectrum: self.stats.spectrum(),
            threshold: self.stats.threshold(),
            improved,
        };
        info!("{}", summary);
        self.history.push(summary);

        Ok(score)
    }

    /// Widens the decision spectrum with `decision` and recentres the
    /// threshold. Returns the new threshold when it moved.
    pub fn update_decision_stats(&mut self, decision: f64) -> Option<f64> {
        self.stats.update(decision)
    }

    /// Trains for `episodes` episodes, then releases the environment.
    pub fn run_for(&mut self, episodes: usize) -> Result<RunReport, SearchError> {
        for i in 0..episodes {
            debug!("TRIAL # {}", i);
            self.run_episode(true)?;
        }
        self.end();
        let report = self.report();
        info!("#### OVERALL REPORT #### {}", report);
        Ok(report)
    }

    /// Replays the best strategy for `episodes` episodes without learning,
    /// then releases the environment.
    pub fn evaluate(&mut self, episodes: usize) -> Result<Vec<f64>, SearchError> {
        let mut scores = Vec::with_capacity(episodes);
        for _ in 0..episodes {
            scores.push(self.run_episode(false)?);
        }
        self.end();
        Ok(scores)
    }

    pub fn end(&mut self) {
        self.env.close();
    }

    pub fn report(&self) -> RunReport {
        RunReport {
            episodes: self.history.len(),
            high_score: self.best.high_score(),
            best_strategy: self.best.best_strategy(),
            spectrum: self.stats.spectrum(),
            threshold: self.stats.threshold(),
        }
    }

    /// The state as it would be written to disk.
    pub fn snapshot(&self) -> PersistedConfig {
        PersistedConfig {
            decision_threshold: self.stats.threshold(),
            decision_spectrum: self.stats.spectrum(),
            high_score: self.best.high_score(),
            best_strategy: self.best.best_strategy().map(Vec::from).unwrap_or_default(),
        }
    }

    /// Writes the current state to the state file. Returns whether it was
    /// written.
    ///
    /// When the high score does not beat the one last loaded, `confirm` decides
    /// whether the file is overwritten.
    pub fn save_config(&mut self, confirm: &mut dyn Confirm) -> Result<bool, SearchError> {
        let config = self.snapshot();
        let last_high_score = self.loaded.as_ref().map_or(0.0, |c| c.high_score);

        if config.high_score <= last_high_score {
            let prompt = format!(
                "Best strategy only achieved {}/{}, save? (y/n)",
                config.high_score, last_high_score
            );
            if !confirm.confirm(&prompt) {
                info!("Kept existing config at {}", self.store.path().display());
                return Ok(false);
            }
        }

        self.store.save(&config)?;
        info!("Saved config to {}", self.store.path().display());
        self.loaded = Some(config);
        Ok(true)
    }

    /// Seeds the agent from the state file. A missing or malformed file is
    /// reported and leaves the agent unchanged. Returns whether state was
    /// loaded.
    #[instrument(level = "info", skip(self), fields(path = %self.store.path().display()))]
    pub fn load_config(&mut self) -> bool {
        let config = match self.store.load() {
            Ok(Some(config)) => config,
            Ok(None) => {
                info!("Cannot find config from {}", self.store.path().display());
                return false;
            }
            Err(e) => {
                warn!("Failed to read config: {}", e);
                return false;
            }
        };

        if let Err(e) = self.apply(&config) {
            warn!("Ignoring config: {}", e);
            return false;
        }

        info!("Loaded config from {}", self.store.path().display());
        self.loaded = Some(config);
        true
    }

    fn apply(&mut self, config: &PersistedConfig) -> Result<(), SearchError> {
        let strategy = if config.best_strategy.is_empty() {
            None
        } else {
            Some(Strategy::try_from(config.best_strategy.as_slice())?)
        };
        self.stats = DecisionStats::new(config.decision_spectrum, config.decision_threshold);
        self.best = BestRecord::new(config.high_score, strategy);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        agent::decision::round_to, env::OBSERVATION_SIZE, persistence::FixedConfirm,
        util::test_util::ScriptedEnvironment,
    };
    use rand::SeedableRng;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile, TempDir};

    fn config_in(dir: &TempDir) -> AgentConfig {
        AgentConfig {
            state_file: dir.path().join("state.json"),
            ..Default::default()
        }
    }

    fn agent(
        env: ScriptedEnvironment,
        config: &AgentConfig,
    ) -> StrategySearchAgent<ScriptedEnvironment> {
        StrategySearchAgent::new(env, StdRng::seed_from_u64(5), config)
    }

    fn observations() -> Vec<[f64; OBSERVATION_SIZE]> {
        vec![
            [0.1, 0.2, -0.3, 0.4],
            [-0.5, 0.1, 0.2, -0.2],
            [0.3, -0.4, 0.1, 0.6],
        ]
    }

    #[test]
    fn test_update_decision_stats_scenario() {
        let dir = tempdir().unwrap();
        let mut agent = agent(ScriptedEnvironment::new(observations()), &config_in(&dir));
        assert_eq!(agent.update_decision_stats(0.37), Some(0.185));
        assert_eq!(agent.spectrum(), DecisionSpectrum::new(0.0, 0.37));
        assert_eq!(agent.update_decision_stats(-0.2), Some(0.085));
        assert_eq!(agent.spectrum(), DecisionSpectrum::new(-0.2, 0.37));
        assert_eq!(agent.update_decision_stats(0.1), None);
    }

    #[test]
    fn test_evaluate_without_best_strategy() {
        let dir = tempdir().unwrap();
        let mut agent = agent(ScriptedEnvironment::new(observations()), &config_in(&dir));
        assert!(matches!(
            agent.run_episode(false),
            Err(SearchError::NoBestStrategy)
        ));
    }

    #[test]
    fn test_episode_stops_when_done() {
        let dir = tempdir().unwrap();
        let env = ScriptedEnvironment::new(observations()).done_after(12);
        let mut agent = agent(env, &config_in(&dir));
        let score = agent.run_episode(true).unwrap();
        assert_eq!(score, 12.0);
        assert_eq!(agent.env().actions.len(), 12);
        assert_eq!(agent.env().renders, 12);
        assert_eq!(agent.history()[0].steps, 12);
        assert!(agent.history()[0].improved);
        assert_eq!(agent.high_score(), 12.0);
        assert!(agent.best_strategy().is_some());
    }

    #[test]
    fn test_perfect_score_at_step_cap_updates_best() {
        let dir = tempdir().unwrap();
        let env = ScriptedEnvironment::new(observations()).reward_for(500);
        let mut agent = agent(env, &config_in(&dir));
        let previous = Strategy::new([0.0; OBSERVATION_SIZE]);
        agent.best = BestRecord::new(500.0, Some(previous));

        let score = agent.run_episode(true).unwrap();

        assert_eq!(score, 500.0);
        assert_eq!(agent.env().actions.len(), 999);
        assert_eq!(agent.high_score(), 500.0);
        assert_ne!(agent.best_strategy(), Some(previous));
    }

    #[test]
    fn test_worse_episode_keeps_best() {
        let dir = tempdir().unwrap();
        let env = ScriptedEnvironment::new(observations()).done_after(3);
        let mut agent = agent(env, &config_in(&dir));
        let previous = Strategy::new([0.5; OBSERVATION_SIZE]);
        agent.best = BestRecord::new(40.0, Some(previous));

        agent.run_episode(true).unwrap();

        assert_eq!(agent.high_score(), 40.0);
        assert_eq!(agent.best_strategy(), Some(previous));
        assert!(!agent.history()[0].improved);
    }

    #[test]
    fn test_actions_follow_threshold() {
        let dir = tempdir().unwrap();
        let env = ScriptedEnvironment::new(observations()).done_after(3);
        let mut agent = agent(env, &config_in(&dir));
        // Decisions: 0.1, -0.5, 0.3
        agent.best = BestRecord::new(1.0, Some(Strategy::new([1.0, 0.0, 0.0, 0.0])));
        agent.stats = DecisionStats::new(DecisionSpectrum::new(-1.0, 1.0), 0.1);

        agent.run_episode(false).unwrap();

        assert_eq!(
            agent.env().actions,
            vec![Action::Right, Action::Left, Action::Right]
        );
    }

    #[test]
    fn test_evaluation_leaves_state_untouched() {
        let dir = tempdir().unwrap();
        let env = ScriptedEnvironment::new(observations()).done_after(3);
        let mut agent = agent(env, &config_in(&dir));
        let best = BestRecord::new(2.0, Some(Strategy::new([1.0, 1.0, 1.0, 1.0])));
        agent.best = best;

        let score = agent.run_episode(false).unwrap();

        assert_eq!(score, 3.0);
        assert_eq!(agent.best, best);
        assert_eq!(agent.spectrum(), DecisionSpectrum::default());
        assert_eq!(agent.threshold(), 0.0);
    }

    #[test]
    fn test_training_invariants_hold() {
        let dir = tempdir().unwrap();
        let env = ScriptedEnvironment::new(observations()).done_after(7);
        let mut agent = agent(env, &config_in(&dir));

        let mut previous_spectrum = agent.spectrum();
        let mut previous_high = agent.high_score();
        for _ in 0..25 {
            agent.run_episode(true).unwrap();
            let spectrum = agent.spectrum();
            assert!(spectrum.min <= previous_spectrum.min);
            assert!(spectrum.max >= previous_spectrum.max);
            assert_eq!(
                agent.threshold(),
                round_to((spectrum.min + spectrum.max) / 2.0, 4)
            );
            assert!(agent.high_score() >= previous_high);
            previous_spectrum = spectrum;
            previous_high = agent.high_score();
        }
        assert!(agent.spectrum().min < 0.0);
        assert!(agent.spectrum().max > 0.0);
    }

    #[test]
    fn test_run_for_closes_environment() {
        let dir = tempdir().unwrap();
        let env = ScriptedEnvironment::new(observations()).done_after(5);
        let mut agent = agent(env, &config_in(&dir));

        let report = agent.run_for(4).unwrap();

        assert_eq!(report.episodes, 4);
        assert_eq!(report.high_score, 5.0);
        assert!(report.best_strategy.is_some());
        assert_eq!(agent.env().resets, 4);
        assert_eq!(agent.env().closes, 1);
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempdir().unwrap();
        let config = config_in(&dir);
        let env = ScriptedEnvironment::new(observations()).done_after(9);
        let mut trained = agent(env.clone(), &config);
        trained.run_for(3).unwrap();

        // Nothing was loaded, so a positive score saves without asking.
        assert!(trained.save_config(&mut FixedConfirm(false)).unwrap());

        let mut restored = agent(env, &config);
        assert!(restored.load_config());
        assert_eq!(restored.threshold(), trained.threshold());
        assert_eq!(restored.spectrum(), trained.spectrum());
        assert_eq!(restored.high_score(), trained.high_score());
        assert_eq!(restored.best_strategy(), trained.best_strategy());
        assert_eq!(restored.snapshot(), trained.snapshot());
    }

    #[test]
    fn test_save_asks_when_not_improved() {
        let dir = tempdir().unwrap();
        let config = config_in(&dir);
        let store = StateStore::new(&config.state_file);
        store
            .save(&PersistedConfig {
                high_score: 30.0,
                best_strategy: vec![0.1, 0.2, 0.3, 0.4],
                ..Default::default()
            })
            .unwrap();

        let env = ScriptedEnvironment::new(observations()).done_after(4);
        let mut agent = agent(env, &config);
        assert!(agent.load_config());
        agent.run_for(2).unwrap();
        assert_eq!(agent.high_score(), 30.0);

        let mut prompts = Vec::new();
        let mut decline = |prompt: &str| {
            prompts.push(prompt.to_string());
            false
        };
        assert!(!agent.save_config(&mut decline).unwrap());
        assert_eq!(prompts, vec!["Best strategy only achieved 30/30, save? (y/n)"]);
        assert_eq!(store.load().unwrap().unwrap().decision_spectrum, DecisionSpectrum::default());

        let mut asked = 0;
        let mut accept = |_: &str| {
            asked += 1;
            true
        };
        assert!(agent.save_config(&mut accept).unwrap());
        assert_eq!(asked, 1);
        assert_eq!(store.load().unwrap().unwrap(), agent.snapshot());
    }

    #[test]
    fn test_load_missing_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let mut agent = agent(ScriptedEnvironment::new(observations()), &config_in(&dir));
        assert!(!agent.load_config());
        assert_eq!(agent.high_score(), 0.0);
        assert_eq!(agent.best_strategy(), None);
    }

    #[test]
    fn test_load_malformed_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[1, 2").unwrap();
        let config = AgentConfig {
            state_file: file.path().to_path_buf(),
            ..Default::default()
        };
        let mut agent = agent(ScriptedEnvironment::new(observations()), &config);
        assert!(!agent.load_config());
        assert_eq!(agent.snapshot(), PersistedConfig::default());
    }

    #[test]
    fn test_load_wrong_strategy_length_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{"high_score": 99, "decision_threshold": 0.3, "best_strategy": [0.1, 0.2]}"#)
            .unwrap();
        let config = AgentConfig {
            state_file: file.path().to_path_buf(),
            ..Default::default()
        };
        let mut agent = agent(ScriptedEnvironment::new(observations()), &config);
        assert!(!agent.load_config());
        assert_eq!(agent.high_score(), 0.0);
        assert_eq!(agent.threshold(), 0.0);
    }
}

use cartpole_search::{
    agent::{report::write_history, StrategySearchAgent},
    config::AgentConfig,
    env::{
        cartpole::{CartPole, CartPoleParams},
        Environment,
    },
    persistence::{FixedConfirm, StateStore},
    util::test_util::setup_test_tracing,
};
use rand::{rngs::StdRng, SeedableRng};
use tempfile::{tempdir, TempDir};
use tracing::info;

fn config_in(dir: &TempDir, episodes: usize) -> AgentConfig {
    AgentConfig {
        episodes,
        state_file: dir.path().join("cartpole-v1.json"),
        seed: Some(17),
        ..Default::default()
    }
}

fn cartpole_agent(config: &AgentConfig, seed: u64) -> StrategySearchAgent<CartPole> {
    let env = CartPole::new(CartPoleParams::default(), Some(seed)).with_render(true);
    StrategySearchAgent::new(env, StdRng::seed_from_u64(seed), config)
}

#[test]
fn test_training_run_on_cartpole() {
    let _guards = setup_test_tracing("training_run_on_cartpole");
    let dir = tempdir().unwrap();
    let config = config_in(&dir, 40);
    let mut agent = cartpole_agent(&config, 17);

    let report = agent.run_for(config.episodes).unwrap();
    info!("Report: {}", report);

    assert_eq!(report.episodes, 40);
    assert!(report.high_score >= 8.0);
    assert!(report.high_score <= 500.0);
    assert!(report.best_strategy.is_some());
    assert!(agent.env().is_closed());

    let history = agent.history();
    let mut high = 0.0;
    for (summary, next) in history.iter().zip(history.iter().skip(1)) {
        assert!(next.high_score >= summary.high_score);
        assert!(next.spectrum.min <= summary.spectrum.min);
        assert!(next.spectrum.max >= summary.spectrum.max);
        high = next.high_score;
    }
    assert_eq!(high, report.high_score);
    assert!(history.iter().all(|s| s.steps as f64 == s.score));
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let dir = tempdir().unwrap();
    let config = config_in(&dir, 15);

    let mut first = cartpole_agent(&config, 99);
    let mut second = cartpole_agent(&config, 99);

    assert_eq!(first.run_for(15).unwrap(), second.run_for(15).unwrap());
}

#[test]
fn test_train_save_then_evaluate() {
    let _guards = setup_test_tracing("train_save_then_evaluate");
    let dir = tempdir().unwrap();
    let config = config_in(&dir, 30);

    let mut trainer = cartpole_agent(&config, 3);
    trainer.run_for(config.episodes).unwrap();
    assert!(trainer.save_config(&mut FixedConfirm(false)).unwrap());

    let saved = StateStore::new(&config.state_file).load().unwrap().unwrap();
    assert_eq!(saved, trainer.snapshot());
    assert_eq!(saved.best_strategy.len(), 4);

    let mut evaluator = cartpole_agent(&config, 4);
    assert!(evaluator.load_config());
    let scores = evaluator.evaluate(3).unwrap();
    assert_eq!(scores.len(), 3);
    assert!(scores.iter().all(|s| *s >= 1.0 && *s <= 500.0));
    assert_eq!(evaluator.snapshot(), saved);
    assert!(evaluator.env().is_closed());

    // Evaluating does not raise the high score, so a second save needs a yes
    assert!(!evaluator.save_config(&mut FixedConfirm(false)).unwrap());
    assert!(evaluator.save_config(&mut FixedConfirm(true)).unwrap());
}

#[test]
fn test_history_csv() {
    let dir = tempdir().unwrap();
    let config = config_in(&dir, 5);
    let mut agent = cartpole_agent(&config, 21);
    agent.run_for(5).unwrap();

    let path = dir.path().join("history.csv");
    write_history(&path, agent.history()).unwrap();

    let mut reader = csv::Reader::from_path(&path).unwrap();
    assert_eq!(reader.records().count(), 5);
}

#[test]
fn test_environment_contract() {
    let mut env = CartPole::new(CartPoleParams::default(), Some(1));
    let observation = env.reset();
    assert_eq!(observation.len(), 4);
    env.render();
    let outcome = env.step(cartpole_search::env::Action::Left);
    assert_eq!(outcome.reward, 1.0);
    assert_eq!(outcome.info.step, 1);
    env.close();
    assert!(env.is_closed());
}

use std::error::Error;

use cartpole_search::{
    agent::{report::write_history, StrategySearchAgent},
    args::Args,
    config::AgentConfig,
    env::cartpole::CartPole,
    logging::setup_tracing,
    persistence::{FixedConfirm, StdinConfirm},
};
use clap::Parser;
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::info;

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let mut config = AgentConfig::read_config(Some(&args.config))?;
    if let Some(episodes) = args.episodes {
        config.episodes = episodes;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    config.validate()?;

    let _guard = setup_tracing(&config.log_settings()?)?;
    info!("Loaded configuration");

    // One seed drives both the environment and strategy sampling
    let mut seeder = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let env = CartPole::new(config.cartpole_params()?, Some(seeder.gen()))
        .with_render(config.render);
    let rng = StdRng::seed_from_u64(seeder.gen());

    let mut agent = StrategySearchAgent::new(env, rng, &config);
    agent.load_config();

    if args.evaluate {
        let episodes = args.episodes.unwrap_or(1);
        let scores = agent.evaluate(episodes)?;
        info!(?scores, "Evaluated best strategy over {} episode(s)", episodes);
    } else {
        agent.run_for(config.episodes)?;
        let saved = if args.yes {
            agent.save_config(&mut FixedConfirm(true))?
        } else {
            agent.save_config(&mut StdinConfirm)?
        };
        if !saved {
            info!("Best strategy was not saved");
        }
    }

    if let Some(path) = &args.history {
        write_history(path, agent.history())?;
    }

    Ok(())
}

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use database::{import_cards, load_cards_yaml, DatabaseConfig, SqliteStore};
use engine::{play_game, EngineConfig, RoundEngine};
use strategies::{InputStrategy, RandomStrategy};
use types::{PlacementStrategy, Requester, UserId};

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StrategyKind {
    Input,
    Random,
}

#[derive(Parser, Debug)]
struct Params {
    /// SQLite URL or file; falls back to DATABASE_URL, then the config file.
    #[arg(long)]
    database_url: Option<String>,

    /// YAML file with game rules and an optional `database_url`.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// YAML card list to import before playing.
    #[arg(long)]
    cards: Option<PathBuf>,

    /// Play as this user; omit for a guest game.
    #[arg(short, long)]
    user: Option<UserId>,

    #[arg(short, long, value_enum, default_value_t = StrategyKind::Input)]
    strategy: StrategyKind,

    /// List the user's games afterwards.
    #[arg(long)]
    history: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Params::parse();
    log::info!("args: {args:?}");

    let (engine_config, yaml_database_url) = match &args.config {
        Some(path) => {
            let yaml = std::fs::read_to_string(path)?;
            let database_url = serde_yaml::from_str::<serde_yaml::Value>(&yaml)?
                .get("database_url")
                .and_then(|value| value.as_str())
                .map(str::to_string);
            (EngineConfig::from_yaml_str(&yaml)?, database_url)
        }
        None => (EngineConfig::default(), None),
    };

    let db_config =
        DatabaseConfig::from_cli_or_env_or_yaml(args.database_url.clone(), yaml_database_url);
    let store = SqliteStore::new(db_config.create_pool().await?);
    store.run_migrations().await?;

    if let Some(path) = &args.cards {
        let cards = load_cards_yaml(path)?;
        import_cards(&store, &cards).await?;
    }

    let engine = RoundEngine::new(store, engine_config);
    let requester = Requester::from(args.user);
    let mut strategy: Box<dyn PlacementStrategy> = match args.strategy {
        StrategyKind::Input => Box::new(InputStrategy::default()),
        StrategyKind::Random => Box::new(RandomStrategy::default()),
    };

    match play_game(&engine, &requester, strategy.as_mut()).await {
        Ok(played) => {
            for verdict in &played.verdicts {
                println!("{}", serde_json::to_string_pretty(verdict)?);
            }
            println!(
                "Game {} finished as {:?} after {} rounds ({} correct) with {} cards",
                played.details.game.id,
                played.details.status(),
                played.details.rounds.len(),
                played.correct_rounds(),
                played.details.cards.len()
            );
        }
        Err(err) => {
            log::error!("Game aborted ({}): {err}", err.status_code());
            return Err(err.into());
        }
    }

    if args.history {
        for summary in engine.list_games(&requester).await? {
            println!("{}", serde_json::to_string(&summary)?);
        }
    }

    Ok(())
}

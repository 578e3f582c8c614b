use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tactics_battle::content::Roster;
use tactics_battle::{BattleConfig, BattleResult, BattleSession, Faction, SkillLibrary, TurnRng};
use tracing_subscriber::EnvFilter;

const SKILLS: &str = include_str!("../data/skills.ron");
const SKIRMISH: &str = include_str!("../data/skirmish.ron");

/// Runs the bundled skirmish headless and prints its battle log.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Options {
    /// RON file with a `BattleConfig`
    config: Option<PathBuf>,
    /// Seed for the roll oracle; random when omitted
    #[arg(long)]
    seed: Option<u64>,
    /// Print the battle log as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run(Options::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(options: Options) -> BattleResult<()> {
    let mut config = match &options.config {
        Some(path) => BattleConfig::load(path)?,
        None => BattleConfig::headless(),
    };
    // Nothing renders the demo, so every presentation wait would only time out.
    config.presentation.enabled = false;
    config.max_turns.get_or_insert(200);

    let library = SkillLibrary::from_ron_str(SKILLS, "data/skills.ron")?;
    let roster = Roster::from_ron_str(SKIRMISH, "data/skirmish.ron")?;

    let rng = options.seed.map_or_else(TurnRng::new_random, TurnRng::seeded);
    let mut session = BattleSession::new(config, rng);
    for (faction, templates) in [(Faction::Ally, &roster.allies), (Faction::Enemy, &roster.enemies)] {
        for template in templates {
            session.register_character(library.build_combatant(template)?, faction);
        }
    }

    session.start_battle();
    let status = session.run().await;

    if options.json {
        match session.events().to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize the battle log: {}", e),
        }
    } else {
        println!("Battle log:");
        session.events().print_formatted(session.registry());
        println!();
        for combatant in session.registry().iter() {
            let stats = combatant.current_stats();
            println!(
                "  {:<14} {:<5} HP {:>4}/{:<4} SP {:>3} MP {:>3}",
                combatant.name(),
                combatant.faction(),
                stats.hp,
                combatant.base_stats().hp,
                stats.sp,
                stats.mp
            );
        }
    }

    tracing::info!("Session finished: {:?}", status);
    Ok(())
}

use anyhow::Context;
use clap::{Parser, Subcommand};
use roomsense::scenario::load_scene;
use roomsense::world::SceneDescription;
use roomsense::{AppConfig, Query, Scenario, ScenarioRunner};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// RON scene file (default: empty 5 x 5 room)
    #[arg(long, global = true)]
    scene: Option<PathBuf>,

    /// List every position instead of just the count
    #[arg(long, global = true)]
    list: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Flood fill the positions the agent can walk to
    Reachable {
        /// Grid spacing (default from configuration)
        #[arg(long)]
        grid_size: Option<f32>,
    },
    /// Check whether a named object is visible from the agent start
    Visible {
        name: String,
        /// Planar view distance (default from configuration)
        #[arg(long)]
        max_distance: Option<f32>,
    },
    /// Every reachable pose from which a named object is visible
    VisibleFrom { name: String },
    /// Run a RON scenario file
    Run { scenario: PathBuf },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let config = AppConfig::load()?;
    let max_listed = if args.list || config.output.list_positions {
        config.output.max_listed
    } else {
        0
    };

    let query = match args.command {
        Command::Run { scenario } => return run_scenario(&scenario, config, max_listed),
        Command::Reachable { grid_size } => Query::Reachable { grid_size },
        Command::Visible { name, max_distance } => Query::Visible {
            object: name,
            max_distance,
        },
        Command::VisibleFrom { name } => Query::VisibleFrom { object: name },
    };

    let description = match &args.scene {
        Some(path) => load_scene(path)?,
        None => {
            log::info!("No --scene given, using an empty 5 x 5 room");
            SceneDescription::walled_room(5.0, 5.0, 2.5, &config.engine)
        }
    };

    let mut runner = ScenarioRunner::new(&description, config.engine)?.with_listing(max_listed);
    let outcome = runner.run_query(&query)?;
    println!("{}", outcome.detail);
    Ok(())
}

fn run_scenario(path: &Path, config: AppConfig, max_listed: usize) -> anyhow::Result<()> {
    let scenario = Scenario::from_file(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let description = scenario
        .scene(base_dir, &config.engine)
        .with_context(|| format!("Failed to load scene for scenario '{}'", scenario.name))?;

    let mut runner = ScenarioRunner::new(&description, config.engine)?.with_listing(max_listed);
    let report = runner.run_scenario(&scenario)?;
    println!("{}", report);

    if !report.passed() {
        eprintln!("Error: {} step(s) did not match expectations", report.failed_steps());
        std::process::exit(1);
    }
    Ok(())
}

mod catalog;
mod reports;
mod simulation;
mod util;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use catalog::{DirectoryCatalog, ProgressFile, load_catalog};
use reports::{ExplorationSummary, RouteCheck, ValidationSummary};
use ruinseeker_game::{GameEngine, LevelTable, PlayerProgress, Selection, attempt_seed};
use util::{parse_seeds, split_csv};

/// Player id used for the single progress file.
const PLAYER_ID: &str = "local";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Console,
    Json,
    Markdown,
}

#[derive(Debug, Parser)]
#[command(name = "ruinseeker-tester", version = "0.1.0")]
#[command(about = "Catalog validation and seeded exploration sweeps for Ruinseeker")]
struct Args {
    /// Directory holding items/sites/routes/ruins/levels JSON (defaults to the bundled catalog)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console, global = true)]
    report: ReportFormat,

    /// Optional path to write the report output instead of stdout
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load the catalog and report cross-reference issues
    Validate,
    /// Preview and run one exploration, crediting the result
    Explore {
        /// Items to equip (comma-separated ids)
        #[arg(long)]
        items: String,

        /// Seed for the discovery roll
        #[arg(long, default_value = "1337")]
        seed: String,

        /// Attempt number under the seed, to replay a later exploration
        #[arg(long, default_value_t = 0)]
        attempt: u64,

        /// Starting experience (overrides any stored experience)
        #[arg(long)]
        experience: Option<u32>,

        /// JSON file holding player progress across runs
        #[arg(long)]
        progress: Option<PathBuf>,
    },
    /// Monte-Carlo discovery distribution and progression sweep
    Simulate {
        /// Seeds to run (comma-separated)
        #[arg(long, default_value = "1337")]
        seeds: String,

        /// Discovery rolls per route and seed
        #[arg(long, default_value_t = 10_000)]
        iterations: usize,

        /// Attempt cap for each progression run
        #[arg(long, default_value_t = 1_000)]
        attempts: usize,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.report == ReportFormat::Console && args.output.is_none() {
        announce_banner();
    }
    let start_time = Instant::now();
    let loader = DirectoryCatalog::new(args.catalog.clone());
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match &args.command {
        Command::Validate => run_validate(&args, &loader, &mut output_target)?,
        Command::Explore {
            items,
            seed,
            attempt,
            experience,
            progress,
        } => {
            let request = ExploreRequest {
                items: split_csv(items),
                seed: first_seed(seed)?,
                attempt: *attempt,
                experience: *experience,
                progress: progress.clone(),
            };
            run_explore(&args, loader, &request, &mut output_target)?;
        }
        Command::Simulate {
            seeds,
            iterations,
            attempts,
        } => {
            let seeds = parse_seeds(seeds)?;
            let catalog = Arc::new(load_catalog(&loader)?);
            if args.verbose {
                println!(
                    "🔁 {} seed(s) x {iterations} rolls per route, {attempts} attempt cap",
                    seeds.len()
                );
            }
            let summary = simulation::run_simulation(&catalog, &seeds, *iterations, *attempts);
            match args.report {
                ReportFormat::Json => reports::generate_json_report(&mut output_target, &summary)?,
                ReportFormat::Markdown => {
                    reports::simulation_markdown(&mut output_target, &summary)?;
                }
                ReportFormat::Console => reports::simulation_console(&mut output_target, &summary)?,
            }
        }
    }

    if args.report == ReportFormat::Console {
        let duration = start_time.elapsed();
        writeln!(&mut output_target)?;
        writeln!(&mut output_target, "🏁 Total time: {duration:?}")?;
    }
    output_target.flush_inner()?;
    Ok(())
}

fn announce_banner() {
    println!("{}", "🏺 Ruinseeker Tester".bright_cyan().bold());
    println!("{}", "====================".cyan());
}

fn first_seed(raw: &str) -> Result<u64> {
    parse_seeds(raw)?
        .first()
        .copied()
        .context("at least one seed is required")
}

fn run_validate(args: &Args, loader: &DirectoryCatalog, out: &mut OutputTarget) -> Result<()> {
    let catalog = load_catalog(loader)?;
    let summary = ValidationSummary::from_catalog(loader.describe(), &catalog);
    match args.report {
        ReportFormat::Json => reports::generate_json_report(out, &summary),
        ReportFormat::Markdown => reports::validation_markdown(out, &summary),
        ReportFormat::Console => reports::validation_console(out, &summary),
    }
}

#[derive(Debug, Clone)]
struct ExploreRequest {
    items: Vec<String>,
    seed: u64,
    attempt: u64,
    experience: Option<u32>,
    progress: Option<PathBuf>,
}

fn run_explore(
    args: &Args,
    loader: DirectoryCatalog,
    request: &ExploreRequest,
    out: &mut OutputTarget,
) -> Result<()> {
    if request.items.is_empty() {
        bail!("--items needs at least one item id");
    }
    let source = loader.describe();
    let engine = GameEngine::new(loader, ProgressFile::new(request.progress.clone()));
    let mut explorer = engine
        .create_explorer(attempt_seed(request.seed, request.attempt))
        .with_context(|| format!("failed to load {source} catalog"))?;
    let catalog = explorer.shared_catalog();
    let levels = catalog.levels();

    let mut progress = engine
        .progress(PLAYER_ID)
        .context("failed to read player progress")?;
    if let Some(experience) = request.experience {
        progress.experience = experience;
        progress.sync_level(levels);
        engine
            .save_progress(PLAYER_ID, &progress)
            .context("failed to store player progress")?;
    }

    let selection: Selection = request.items.iter().cloned().collect();
    let warnings = loadout_warnings(&selection, levels, &progress, |id| {
        catalog.item(id).is_some()
    });
    let preview = explorer.preview(&selection);
    let matcher = explorer.matcher();
    let rejections = catalog
        .routes()
        .iter()
        .filter_map(|route| {
            matcher
                .check_route(route, &selection, preview.total_weight)
                .err()
                .map(|reason| RouteCheck {
                    route_id: route.id.clone(),
                    reason: reason.to_string(),
                })
        })
        .collect();

    let result = explorer.execute(&selection);
    let update = engine
        .record_exploration(PLAYER_ID, levels, &result)
        .context("failed to record exploration")?;
    let progress = update
        .as_ref()
        .map_or(progress, |update| update.progress.clone());

    let summary = ExplorationSummary {
        seed: request.seed,
        attempt: request.attempt,
        selection,
        warnings,
        preview,
        rejections,
        result,
        update,
        progress,
    };
    match args.report {
        ReportFormat::Json => reports::generate_json_report(out, &summary),
        ReportFormat::Markdown => reports::exploration_markdown(out, &summary),
        ReportFormat::Console => reports::exploration_console(out, &summary),
    }
}

/// Loadout problems the caller would normally reject before exploring.
fn loadout_warnings(
    selection: &Selection,
    levels: &LevelTable,
    progress: &PlayerProgress,
    known: impl Fn(&str) -> bool,
) -> Vec<String> {
    let mut warnings = Vec::new();
    let slots = levels.max_item_slots(progress.level);
    if u32::try_from(selection.len()).unwrap_or(u32::MAX) > slots {
        warnings.push(format!(
            "{} items equipped but level {} allows {slots}",
            selection.len(),
            progress.level
        ));
    }
    for id in selection.iter() {
        if !known(id) {
            warnings.push(format!("unknown item `{id}` adds no weight"));
        } else if !levels.is_item_unlocked(id, progress.level) {
            warnings.push(format!("`{id}` is not unlocked at level {}", progress.level));
        }
    }
    warnings
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "ruinseeker-main-{label}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ))
    }

    fn args(report: ReportFormat, output: PathBuf, command: Command) -> Args {
        Args {
            catalog: None,
            report,
            output: Some(output),
            verbose: false,
            command,
        }
    }

    #[test]
    fn validate_writes_json_summary() {
        let path = temp_path("validate.json");
        let args = args(ReportFormat::Json, path.clone(), Command::Validate);
        let mut out = OutputTarget::new(args.output.clone()).unwrap();
        run_validate(&args, &DirectoryCatalog::default(), &mut out).unwrap();
        out.flush_inner().unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(value["source"], "bundled");
        assert_eq!(value["issues"].as_array().map(Vec::len), Some(0));
    }

    #[test]
    fn explore_persists_progress_between_runs() {
        let progress_path = temp_path("progress.json");
        let request = ExploreRequest {
            items: vec![
                String::from("brush"),
                String::from("trowel"),
                String::from("notebook"),
            ],
            seed: 7,
            attempt: 0,
            experience: None,
            progress: Some(progress_path.clone()),
        };
        let report = temp_path("explore.json");
        let args = args(
            ReportFormat::Json,
            report.clone(),
            Command::Explore {
                items: String::new(),
                seed: String::from("7"),
                attempt: 0,
                experience: None,
                progress: None,
            },
        );
        let mut out = OutputTarget::new(args.output.clone()).unwrap();
        run_explore(&args, DirectoryCatalog::default(), &request, &mut out).unwrap();
        out.flush_inner().unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(report).unwrap()).unwrap();
        assert_eq!(value["preview"]["can_explore"], true);
        assert_eq!(value["result"]["outcome"], "success");
        let stored: PlayerProgress =
            serde_json::from_str(&std::fs::read_to_string(progress_path).unwrap()).unwrap();
        assert!(stored.experience > 0);
        assert_eq!(stored.discovery_count(), 1);
    }

    #[test]
    fn explore_rejects_empty_loadouts() {
        let request = ExploreRequest {
            items: Vec::new(),
            seed: 1,
            attempt: 0,
            experience: None,
            progress: None,
        };
        let path = temp_path("empty.txt");
        let args = args(ReportFormat::Console, path, Command::Validate);
        let mut out = OutputTarget::new(args.output.clone()).unwrap();
        assert!(run_explore(&args, DirectoryCatalog::default(), &request, &mut out).is_err());
    }

    #[test]
    fn loadout_warnings_flag_locks_slots_and_unknowns() {
        let catalog = ruinseeker_game::GameCatalog::load_default().unwrap();
        let levels = catalog.levels();
        let selection: Selection = ["brush", "trowel", "notebook", "ground_radar", "sonar"]
            .into_iter()
            .collect();
        let warnings = loadout_warnings(&selection, levels, &PlayerProgress::default(), |id| {
            catalog.item(id).is_some()
        });
        assert!(warnings.iter().any(|w| w.contains("allows 3")));
        assert!(warnings.iter().any(|w| w.contains("`ground_radar` is not unlocked")));
        assert!(warnings.iter().any(|w| w.contains("unknown item `sonar`")));
    }

    #[test]
    fn first_seed_takes_the_leading_value() {
        assert_eq!(first_seed("9, 4").unwrap(), 9);
        assert!(first_seed("").is_err());
    }
}

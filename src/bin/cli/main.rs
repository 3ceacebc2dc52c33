//! Binary entry point for the `adjoin` CLI.
#![forbid(unsafe_code)]

mod config;
mod ui;

use std::error::Error;
use std::io;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;

use adjoin::adjoint::{
    build_region, build_regions, merge_regions, write_json_new, BatchReport, MergeOutcome,
    RegionJob, RegionOutcome,
};
use adjoin::check::{check_adjoint, CheckReport};
use adjoin::tree::build_tree;
use adjoin::{
    trace, trace_linear, AdjointMap, AdjointOptions, ColumnNames, Direction, SegmentId,
    SegmentTable, StreamOrder, DEFAULT_CUTOFF,
};

use config::{CliConfig, Profile, ProfileUpdate};
use ui::{format_duration, Theme, Ui};

#[derive(Parser, Debug)]
#[command(
    name = "adjoin",
    version,
    about = "Build upstream and downstream adjoint dictionaries for river networks",
    disable_help_subcommand = true
)]
struct Cli {
    #[command(flatten)]
    columns: ColumnArgs,

    #[arg(long, global = true, value_name = "NAME", help = "Profile to load defaults from")]
    profile: Option<String>,

    #[arg(
        long,
        global = true,
        value_name = "FILE",
        env = "ADJOIN_CONFIG",
        help = "CLI config file (defaults to the user config directory)"
    )]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for structured responses"
    )]
    format: OutputFormat,

    #[arg(long, short, global = true, help = "Reduce output to plain lines")]
    quiet: bool,

    #[arg(long, global = true, value_enum, default_value_t = Theme::Auto, help = "Color theme")]
    theme: Theme,

    #[arg(
        short,
        long,
        global = true,
        action = ArgAction::Count,
        help = "Increase log verbosity (-v debug, -vv trace)"
    )]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Default)]
struct ColumnArgs {
    #[arg(long, global = true, value_name = "NAME", help = "Segment id column [default: COMID]")]
    id_column: Option<String>,

    #[arg(
        long,
        global = true,
        value_name = "NAME",
        help = "Next-down id column [default: NextDownID]"
    )]
    next_down_column: Option<String>,

    #[arg(long, global = true, value_name = "NAME", help = "Stream order column [default: order_]")]
    order_column: Option<String>,
}

#[derive(Args, Debug, Default)]
struct TreeArgs {
    #[arg(long, short, value_enum, help = "Trace direction [default: up]")]
    direction: Option<DirectionArg>,

    #[arg(long, value_name = "N", help = "Restrict to one stream order (0 = whole network)")]
    order: Option<StreamOrder>,
}

#[derive(Args, Debug, Default)]
struct TraceArgs {
    #[command(flatten)]
    tree: TreeArgs,

    #[arg(long, value_name = "N", help = "Dequeues after which a trace gives up [default: 200]")]
    cutoff: Option<usize>,
}

// Column overrides for `profiles save` come from the global column flags.
#[derive(Args, Debug)]
struct ProfileArgs {
    #[arg(value_name = "NAME")]
    name: String,

    #[arg(long, value_enum)]
    direction: Option<DirectionArg>,

    #[arg(long, value_name = "N")]
    order: Option<StreamOrder>,

    #[arg(long, value_name = "N")]
    cutoff: Option<usize>,

    #[arg(long, value_name = "N")]
    threads: Option<usize>,

    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    #[arg(long = "default", help = "Make this the default profile")]
    make_default: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Build the dictionary of one segment table")]
    Build {
        #[arg(value_name = "TABLE")]
        table: PathBuf,

        #[arg(long, value_name = "FILE", help = "Output file [default: <out-dir>/<region>-<direction>-dict.json]")]
        out: Option<PathBuf>,

        #[arg(long, value_name = "DIR", help = "Output directory when --out is not given")]
        out_dir: Option<PathBuf>,

        #[command(flatten)]
        trace: TraceArgs,
    },

    #[command(about = "Build dictionaries for several regions concurrently")]
    Batch {
        #[arg(value_name = "TABLE", required = true)]
        tables: Vec<PathBuf>,

        #[arg(long, value_name = "DIR", help = "Output directory for region dictionaries")]
        out_dir: Option<PathBuf>,

        #[arg(long, value_name = "N", help = "Worker threads (0 = available parallelism)")]
        threads: Option<usize>,

        #[command(flatten)]
        trace: TraceArgs,
    },

    #[command(about = "Merge region dictionaries into one file")]
    Merge {
        #[arg(value_name = "JSON", required = true)]
        inputs: Vec<PathBuf>,

        #[arg(long, value_name = "FILE", required = true)]
        out: PathBuf,
    },

    #[command(about = "Dump the upstream or downstream tree of a table")]
    Tree {
        #[arg(value_name = "TABLE")]
        table: PathBuf,

        #[arg(long, value_name = "FILE", help = "Write the tree to a file instead of stdout")]
        out: Option<PathBuf>,

        #[command(flatten)]
        tree: TreeArgs,
    },

    #[command(about = "Trace the chain of a single segment")]
    Trace {
        #[arg(value_name = "TABLE")]
        table: PathBuf,

        #[arg(value_name = "ID", allow_negative_numbers = true)]
        id: SegmentId,

        #[arg(long, help = "Follow one successor per hop (order-filtered trees)")]
        linear: bool,

        #[command(flatten)]
        trace: TraceArgs,
    },

    #[command(about = "Check a dictionary against its segment table")]
    Check {
        #[arg(value_name = "TABLE")]
        table: PathBuf,

        #[arg(value_name = "JSON")]
        dict: PathBuf,

        #[command(flatten)]
        tree: TreeArgs,
    },

    #[command(about = "Manage CLI profiles")]
    Profiles {
        #[command(subcommand)]
        action: Option<ProfilesCommand>,
    },

    #[command(about = "Print shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
enum ProfilesCommand {
    #[command(about = "List configured profiles")]
    List,
    #[command(about = "Show one profile")]
    Show {
        #[arg(value_name = "NAME")]
        name: String,
    },
    #[command(about = "Create or update a profile")]
    Save(ProfileArgs),
    #[command(about = "Delete a profile")]
    Delete {
        #[arg(value_name = "NAME")]
        name: String,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum DirectionArg {
    #[value(alias = "upstream")]
    Up,
    #[value(alias = "downstream")]
    Down,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Up => Direction::Upstream,
            DirectionArg::Down => Direction::Downstream,
        }
    }
}

/// Effective settings after merging flags over the selected profile.
struct Settings {
    columns: ColumnNames,
    direction: Direction,
    order: StreamOrder,
    cutoff: usize,
    threads: usize,
    out_dir: Option<PathBuf>,
}

impl Settings {
    fn resolve(columns: &ColumnArgs, profile: Option<&Profile>) -> Self {
        let defaults = ColumnNames::default();
        let pick = |flag: &Option<String>, from_profile: Option<&String>, default: String| {
            flag.clone().or_else(|| from_profile.cloned()).unwrap_or(default)
        };
        Self {
            columns: ColumnNames::new(
                pick(
                    &columns.id_column,
                    profile.and_then(|p| p.id_column.as_ref()),
                    defaults.id,
                ),
                pick(
                    &columns.next_down_column,
                    profile.and_then(|p| p.next_down_column.as_ref()),
                    defaults.next_down,
                ),
                pick(
                    &columns.order_column,
                    profile.and_then(|p| p.order_column.as_ref()),
                    defaults.order,
                ),
            ),
            direction: profile
                .and_then(|p| p.direction)
                .unwrap_or(Direction::Upstream),
            order: profile.and_then(|p| p.order).unwrap_or(0),
            cutoff: profile.and_then(|p| p.cutoff).unwrap_or(DEFAULT_CUTOFF),
            threads: profile.and_then(|p| p.threads).unwrap_or(0),
            out_dir: profile.and_then(|p| p.out_dir.clone()),
        }
    }

    fn apply_tree(&mut self, args: &TreeArgs) {
        if let Some(direction) = args.direction {
            self.direction = direction.into();
        }
        if let Some(order) = args.order {
            self.order = order;
        }
    }

    fn apply_trace(&mut self, args: &TraceArgs) {
        self.apply_tree(&args.tree);
        if let Some(cutoff) = args.cutoff {
            self.cutoff = cutoff;
        }
    }

    fn order_filter(&self) -> Option<StreamOrder> {
        (self.order != 0).then_some(self.order)
    }

    fn options(&self) -> AdjointOptions {
        let mut opts = AdjointOptions::new(self.direction);
        opts.order = self.order;
        opts.trace.cutoff = self.cutoff;
        opts.columns = self.columns.clone();
        opts
    }

    fn load_table(&self, path: &Path) -> Result<SegmentTable, Box<dyn Error>> {
        Ok(SegmentTable::from_csv_path(
            path,
            &self.columns,
            self.order != 0,
        )?)
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let ui = Ui::new(cli.theme, cli.quiet);

    let mut config = CliConfig::load(cli.config.clone())?;
    let mut settings = Settings::resolve(&cli.columns, config.resolve(cli.profile.as_deref())?);

    match cli.command {
        Command::Build {
            table,
            out,
            out_dir,
            trace,
        } => {
            settings.apply_trace(&trace);
            let job = match out {
                Some(out) => RegionJob::with_output(table, out),
                None => {
                    let dir = out_dir
                        .or_else(|| settings.out_dir.clone())
                        .unwrap_or_else(|| PathBuf::from("."));
                    RegionJob::new(table, &dir, settings.direction)
                }
            };
            let task = ui.task(format!("building {} ({})", job.name, settings.direction));
            let outcome = build_region(&job, &settings.options())?;
            task.finish();
            emit(&cli.format, &outcome, || print_outcome(&ui, &outcome))?;
        }
        Command::Batch {
            tables,
            out_dir,
            threads,
            trace,
        } => {
            settings.apply_trace(&trace);
            let out_dir = out_dir
                .or_else(|| settings.out_dir.clone())
                .ok_or("batch requires --out-dir (or a profile with out_dir)")?;
            let threads = threads.unwrap_or(settings.threads);
            let jobs: Vec<RegionJob> = tables
                .into_iter()
                .map(|table| RegionJob::new(table, &out_dir, settings.direction))
                .collect();
            let task = ui.task(format!("building {} region(s)", jobs.len()));
            let report = build_regions(&jobs, &settings.options(), threads)?;
            let elapsed = task.finish();
            emit(&cli.format, &report, || print_batch(&ui, &report, elapsed))?;
            if report.failed() > 0 {
                std::process::exit(1);
            }
        }
        Command::Merge { inputs, out } => {
            let task = ui.task(format!("merging {} dictionaries", inputs.len()));
            let outcome = merge_regions(&inputs, &out)?;
            task.finish();
            emit(&cli.format, &outcome, || print_merge(&ui, &outcome))?;
        }
        Command::Tree { table, out, tree } => {
            settings.apply_tree(&tree);
            let table = settings.load_table(&table)?;
            let tree = build_tree(&table, settings.direction, settings.order_filter())?;
            match out {
                Some(out) => {
                    if write_json_new(&out, &tree)? {
                        ui.success(&format!(
                            "wrote {} tree with {} keys to {}",
                            tree.direction(),
                            tree.len(),
                            out.display()
                        ));
                    } else {
                        ui.info(&format!("{} already exists, left untouched", out.display()));
                    }
                }
                None => println!("{}", serde_json::to_string_pretty(&tree)?),
            }
        }
        Command::Trace {
            table,
            id,
            linear,
            trace: trace_args,
        } => {
            settings.apply_trace(&trace_args);
            let table = settings.load_table(&table)?;
            let tree = build_tree(&table, settings.direction, settings.order_filter())?;
            if linear {
                let chain = trace_linear(&tree, id)?;
                emit(&cli.format, &chain, || println!("{}", join_ids(&chain)))?;
            } else {
                let result = trace(&tree, id, settings.cutoff);
                emit(&cli.format, &result, || {
                    println!("{}", join_ids(&result.ids));
                    if result.is_truncated() {
                        ui.warn(&format!(
                            "stopped after {} dequeues with {} id(s) pending",
                            result.dequeues, result.pending
                        ));
                    }
                })?;
            }
        }
        Command::Check { table, dict, tree } => {
            settings.apply_tree(&tree);
            let table = settings.load_table(&table)?;
            let map = AdjointMap::read_json(&dict)?;
            let report = check_adjoint(&table, &map, settings.direction, settings.order_filter());
            emit(&cli.format, &report, || print_check(&ui, &report))?;
            if !report.success {
                std::process::exit(2);
            }
        }
        Command::Profiles { action } => {
            run_profiles(&ui, &cli.format, &mut config, &cli.columns, action)?;
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "adjoin", &mut io::stdout());
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "adjoin=debug",
        _ => "adjoin=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run_profiles(
    ui: &Ui,
    format: &OutputFormat,
    config: &mut CliConfig,
    columns: &ColumnArgs,
    action: Option<ProfilesCommand>,
) -> Result<(), Box<dyn Error>> {
    match action.unwrap_or(ProfilesCommand::List) {
        ProfilesCommand::List => {
            let profiles: Vec<&Profile> = config.profiles().collect();
            emit(format, &profiles, || {
                if profiles.is_empty() {
                    ui.info("no profiles configured");
                    return;
                }
                let default = config.default_profile_name();
                ui.list(
                    "Profiles",
                    profiles.iter().map(|p| {
                        if Some(p.name.as_str()) == default {
                            format!("{} (default)", p.name)
                        } else {
                            p.name.clone()
                        }
                    }),
                );
            })?;
        }
        ProfilesCommand::Show { name } => {
            let profile = config
                .profile(&name)
                .ok_or_else(|| format!("profile '{name}' not found"))?;
            emit(format, profile, || print_profile(ui, profile))?;
        }
        ProfilesCommand::Save(args) => {
            let update = ProfileUpdate {
                id_column: columns.id_column.clone(),
                next_down_column: columns.next_down_column.clone(),
                order_column: columns.order_column.clone(),
                direction: args.direction.map(Direction::from),
                order: args.order,
                cutoff: args.cutoff,
                threads: args.threads,
                out_dir: args.out_dir,
            };
            config.upsert_profile(&args.name, update)?;
            if args.make_default {
                config.set_default_profile(Some(&args.name))?;
            }
            let path = config.persist()?;
            ui.success(&format!("saved profile '{}' to {}", args.name, path.display()));
        }
        ProfilesCommand::Delete { name } => {
            config.delete_profile(&name)?;
            let path = config.persist()?;
            ui.success(&format!("deleted profile '{name}' from {}", path.display()));
        }
    }
    Ok(())
}

fn emit<T, F>(format: &OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: serde::Serialize + ?Sized,
    F: FnOnce(),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(),
    }
    Ok(())
}

fn join_ids(ids: &[SegmentId]) -> String {
    ids.iter()
        .map(SegmentId::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn print_outcome(ui: &Ui, outcome: &RegionOutcome) {
    match outcome {
        RegionOutcome::Computed {
            region,
            output,
            segments,
            stats,
            duration_ms,
        } => {
            ui.success(&format!(
                "{region}: {segments} segments in {duration_ms:.0}ms -> {}",
                output.display()
            ));
            if stats.truncated > 0 {
                ui.warn(&format!(
                    "{region}: {} trace(s) stopped at the cutoff",
                    stats.truncated
                ));
            }
            if stats.dropped_parents > 0 {
                ui.warn(&format!(
                    "{region}: {} same-order parent(s) dropped",
                    stats.dropped_parents
                ));
            }
        }
        RegionOutcome::Skipped { region, output } => {
            ui.info(&format!("{region}: {} exists, skipped", output.display()));
        }
        RegionOutcome::Failed { region, error } => {
            ui.error(&format!("{region}: {error}"));
        }
    }
}

fn print_batch(ui: &Ui, report: &BatchReport, elapsed: std::time::Duration) {
    for outcome in &report.outcomes {
        print_outcome(ui, outcome);
    }
    ui.section(
        "Batch",
        [
            ("computed", report.computed().to_string()),
            ("skipped", report.skipped().to_string()),
            ("failed", report.failed().to_string()),
            ("elapsed", format_duration(elapsed)),
        ],
    );
}

fn print_merge(ui: &Ui, outcome: &MergeOutcome) {
    match outcome {
        MergeOutcome::Merged(report) => {
            ui.success(&format!(
                "merged {} region(s), {} segments -> {}",
                report.regions,
                report.segments,
                report.output.display()
            ));
            if !report.collisions.is_empty() {
                ui.warn(&format!(
                    "{} id(s) appeared in more than one region; first occurrence kept",
                    report.collisions.len()
                ));
                ui.list(
                    "Collisions",
                    report.collisions.iter().take(10).map(|c| {
                        format!("{} kept from {}, dropped from {}", c.id, c.kept_from, c.dropped_from)
                    }),
                );
            }
        }
        MergeOutcome::Skipped { output } => {
            ui.info(&format!("{} exists, skipped", output.display()));
        }
    }
}

fn print_check(ui: &Ui, report: &CheckReport) {
    let order = report
        .order
        .map(|order| order.to_string())
        .unwrap_or_else(|| "all".to_string());
    ui.section(
        "Check",
        [
            ("direction", report.direction.to_string()),
            ("order", order),
            ("entries", report.counts.entries.to_string()),
            ("missing", report.counts.missing_keys.to_string()),
            ("errors", report.counts.errors.to_string()),
            ("warnings", report.counts.warnings.to_string()),
        ],
    );
    ui.list(
        "Findings",
        report.findings.iter().map(|finding| match finding.key {
            Some(key) => format!("{:?} [{key}]: {}", finding.severity, finding.message),
            None => format!("{:?}: {}", finding.severity, finding.message),
        }),
    );
    if report.success {
        ui.success("dictionary is consistent with the table");
    } else {
        ui.error("dictionary is inconsistent with the table");
    }
}

fn print_profile(ui: &Ui, profile: &Profile) {
    let show = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());
    ui.section(
        &format!("Profile {}", profile.name),
        [
            ("id_column", show(profile.id_column.clone())),
            ("next_down_column", show(profile.next_down_column.clone())),
            ("order_column", show(profile.order_column.clone())),
            ("direction", show(profile.direction.map(|d| d.to_string()))),
            ("order", show(profile.order.map(|o| o.to_string()))),
            ("cutoff", show(profile.cutoff.map(|c| c.to_string()))),
            ("threads", show(profile.threads.map(|t| t.to_string()))),
            (
                "out_dir",
                show(profile.out_dir.as_ref().map(|d| d.display().to_string())),
            ),
        ],
    );
}

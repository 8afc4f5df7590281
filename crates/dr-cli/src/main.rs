//! dashreport - render dashboard views into PDF reports.

use clap::{Args, Parser, Subcommand};
use dr_cli::commands::{self, ProgressMode, RenderRequest};
use dr_cli::{init_logging, load_config, ExitCode, LogConfig, LogFormat, LogLevel};
use dr_report::ReportError;
use serde::Serialize;
use std::path::PathBuf;

/// Render dashboard views into multi-page PDF reports
#[derive(Parser)]
#[command(name = "dashreport")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Report configuration file (TOML or JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log format on stderr (human, jsonl)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a PDF report from a dashboard view
    Render(RenderArgs),
    /// Print the pagination plan for a number of panels
    Plan(PlanArgs),
    /// Resolve and validate the configuration
    CheckConfig,
    /// Print version information
    Version,
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Dashboard view fixture (JSON)
    #[arg(long)]
    view: PathBuf,

    /// Two-page template PDF (cover and back page)
    #[arg(long)]
    template: PathBuf,

    /// PNG logo placed on the first content page
    #[arg(long)]
    logo: Option<PathBuf>,

    /// Where to write the report
    #[arg(long, short = 'o')]
    output: PathBuf,

    /// Skip the table-of-contents page
    #[arg(long)]
    no_toc: bool,

    /// Organization shown in footers
    #[arg(long)]
    organization: Option<String>,

    /// Progress reporting
    #[arg(long, value_enum, default_value_t = ProgressMode::Log)]
    progress: ProgressMode,

    /// Also write the captured entry sequence as JSON
    #[arg(long)]
    dump_entries: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct PlanArgs {
    /// Number of valid panels
    #[arg(long)]
    panels: usize,

    /// Plan without a table-of-contents page
    #[arg(long)]
    no_toc: bool,

    /// Organization shown in footers
    #[arg(long, default_value = "")]
    organization: String,
}

fn main() {
    let cli = Cli::parse();

    let cli_level = (cli.global.verbose > 0 || cli.global.quiet)
        .then(|| LogLevel::from_verbosity(cli.global.verbose, cli.global.quiet));
    init_logging(&LogConfig::from_env(cli_level, cli.global.log_format));

    let exit_code = match &cli.command {
        Commands::Render(args) => run_render(&cli.global, args),
        Commands::Plan(args) => run_plan(args),
        Commands::CheckConfig => run_check_config(&cli.global),
        Commands::Version => {
            println!("dashreport {}", env!("CARGO_PKG_VERSION"));
            ExitCode::Clean
        }
    };
    std::process::exit(exit_code.as_i32());
}

fn fail(err: &ReportError) -> ExitCode {
    let code = ExitCode::from(err);
    eprintln!("dashreport: {} [{}]", err, code.code_name());
    code
}

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::Clean
        }
        Err(err) => fail(&ReportError::Json(err)),
    }
}

fn run_render(global: &GlobalOpts, args: &RenderArgs) -> ExitCode {
    let mut config = match load_config(global.config.as_deref()) {
        Ok(resolved) => resolved.config,
        Err(err) => return fail(&err),
    };
    if args.no_toc {
        config.allow_table_of_contents = false;
    }
    if let Some(organization) = &args.organization {
        config.organization = organization.clone();
    }

    let request = RenderRequest {
        view: args.view.clone(),
        template: args.template.clone(),
        logo: args.logo.clone(),
        output: args.output.clone(),
        progress: args.progress,
        dump_entries: args.dump_entries.clone(),
    };

    // The pipeline shares the view on one thread; a current-thread runtime
    // is all it needs.
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => return fail(&ReportError::Io(err)),
    };
    match runtime.block_on(commands::render(&config, &request)) {
        Ok(summary) => print_json(&summary),
        Err(err) => fail(&err),
    }
}

fn run_plan(args: &PlanArgs) -> ExitCode {
    print_json(&commands::plan(args.panels, !args.no_toc, &args.organization))
}

fn run_check_config(global: &GlobalOpts) -> ExitCode {
    match load_config(global.config.as_deref()) {
        Ok(resolved) => print_json(&resolved),
        Err(err) => fail(&err),
    }
}

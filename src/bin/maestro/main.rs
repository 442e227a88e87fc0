use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use log::{debug, info};

use maestro::build_registry;
use maestro::console::Console;
use maestro::operation::Context;
use maestro::operation::help;
use maestro::operation::invoker::Invoker;
use maestro::operation::registry::Registry;
use maestro::outcome::{EXIT_USAGE, Outcome};
use maestro::process::SystemRunner;
use maestro::project::Project;
use maestro::prompt;

#[derive(Parser, Debug)]
#[command(
    name = "maestro",
    version,
    about = "Run the linters, formatters, type checker and tests of a Python project",
    disable_version_flag = true
)]
struct Cli {
    /// Run as if started in DIR
    #[arg(short = 'C', long, value_name = "DIR")]
    directory: Option<PathBuf>,

    /// Show debug logging
    #[arg(long)]
    verbose: bool,

    /// Also write the log to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print the version
    #[arg(short = 'v', long, action = ArgAction::Version)]
    version: Option<bool>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the available operations
    List {
        /// Print the operations and their parameters as JSON
        #[arg(long)]
        json: bool,
    },
    /// Any registered operation, e.g. `maestro linting` or `maestro pyproject ruff -f`
    #[command(external_subcommand)]
    Operation(Vec<String>),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let log_file = cli.log_file.as_deref().map(File::create).transpose()?;
    maestro::logger::init(cli.verbose, log_file)?;

    let registry = build_registry()?;
    match cli.command {
        Commands::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&help::describe(&registry))?);
            } else {
                print!("{}", help::listing(&registry));
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Operation(tokens) => Ok(dispatch(&registry, cli.directory.as_deref(), &tokens)),
    }
}

fn dispatch(registry: &Registry, directory: Option<&Path>, tokens: &[String]) -> ExitCode {
    let (operation, args) = match registry.resolve_tokens(tokens) {
        Ok(found) => found,
        Err(e) => return fail(&e, EXIT_USAGE),
    };

    if wants_help(args) {
        print!("{}", help::usage(registry, operation));
        return ExitCode::SUCCESS;
    }

    let project = match Project::discover(directory) {
        Ok(project) => project,
        Err(e) => return fail(&e, e.exit_code()),
    };
    info!("Project root: {}", project.root.display());

    let console = Console::terminal();
    let prompter = prompt::for_stdin();
    let context = Context {
        project: &project,
        console: &console,
        runner: &SystemRunner,
        prompter: prompter.as_ref(),
    };
    let invoker = Invoker::new(registry, context);

    debug!("Dispatching '{}' with {args:?}", operation.name);
    match invoker.invoke_operation(operation, args) {
        Ok(Outcome::Success) => ExitCode::SUCCESS,
        Ok(Outcome::Failed { code }) => exit_code(code),
        Err(e) => fail(&e, e.exit_code()),
    }
}

/// `--help` or `-h` before any `--`.
fn wants_help(args: &[String]) -> bool {
    args.iter()
        .take_while(|arg| *arg != "--")
        .any(|arg| arg == "--help" || arg == "-h")
}

fn fail(err: &dyn std::error::Error, code: i32) -> ExitCode {
    eprintln!("Error: {err}");
    exit_code(code)
}

fn exit_code(code: i32) -> ExitCode {
    u8::try_from(code).map_or(ExitCode::FAILURE, ExitCode::from)
}

//! Main CLI application

use crate::config::{load_config, validate_config};
use crate::error::SprocketError;
use crate::runner::{execute, Context, TaskName, Verbosity};
use crate::ui::{self, Level};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use clap_complete::Shell;
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::Ordering;

/// Exit code used when a second Ctrl+C forces the process down
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// CLI application
pub struct App {
    /// The clap command
    command: Command,
}

impl App {
    pub fn new() -> Self {
        App {
            command: build_command(),
        }
    }

    /// Run the application with the process arguments
    pub fn run(self) -> Result<(), SprocketError> {
        self.run_from(std::env::args_os())
    }

    /// Run the application with explicit arguments
    pub fn run_from<I, T>(mut self, args: I) -> Result<(), SprocketError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = self.command.clone().get_matches_from(args);
        let verbosity = get_verbosity(&matches);

        let task_name = match matches.subcommand() {
            Some(("completions", sub_matches)) => {
                if let Some(shell) = sub_matches.get_one::<Shell>("shell").copied() {
                    clap_complete::generate(shell, &mut self.command, "sprocket", &mut io::stdout());
                }
                return Ok(());
            }
            Some((name, _)) => name.parse::<TaskName>()?,
            None => TaskName::Default,
        };

        let file = matches.get_one::<String>("file").map(PathBuf::from);
        let (config, root) = load_config(file.as_deref())?;
        validate_config(&config)?;

        let ctx = Context::new(config)
            .with_root(root)
            .with_verbosity(verbosity);

        if task_name.is_long_running() {
            install_interrupt_handler(&ctx)?;
        }

        execute(task_name, &ctx)?;
        Ok(())
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

/// First Ctrl+C asks long-running tasks to stop; a second one exits
fn install_interrupt_handler(ctx: &Context) -> Result<(), SprocketError> {
    let flag = ctx.shutdown_flag();
    let quiet = ctx.verbosity < Verbosity::Normal;

    ctrlc::set_handler(move || {
        if flag.swap(true, Ordering::SeqCst) {
            process::exit(INTERRUPTED_EXIT_CODE);
        }
        if !quiet {
            ui::print(Level::Info, "Stopping (press Ctrl+C again to force)");
        }
    })
    .map_err(|e| io::Error::other(e.to_string()))?;

    Ok(())
}

/// Build the clap command
pub fn build_command() -> Command {
    let mut cmd = Command::new("sprocket")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A front-end asset pipeline with a live-reload dev server")
        .after_help("Runs the `default` task when no task is given.")
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .help("Path to sprocket.yml config file")
                .global(true),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print warnings and errors")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("silent")
                .short('s')
                .long("silent")
                .help("Print no output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Print verbose output")
                .action(ArgAction::SetTrue)
                .global(true),
        );

    for name in TaskName::all() {
        cmd = cmd.subcommand(Command::new(name.as_str()).about(name.about()));
    }

    cmd.subcommand(
        Command::new("completions")
            .about("Print a shell completion script")
            .arg(
                Arg::new("shell")
                    .value_name("SHELL")
                    .required(true)
                    .value_parser(value_parser!(Shell)),
            ),
    )
}

/// Get verbosity level from matches
fn get_verbosity(matches: &ArgMatches) -> Verbosity {
    if matches.get_flag("silent") {
        Verbosity::Silent
    } else if matches.get_flag("quiet") {
        Verbosity::Quiet
    } else if matches.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

/// Run the CLI application
pub fn run() -> Result<(), SprocketError> {
    App::new().run()
}

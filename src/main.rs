#![forbid(unsafe_code, non_ascii_idents)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::correctness,
    clippy::suspicious,
    clippy::cargo,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::nursery,
    deprecated_in_future,
    future_incompatible,
    nonstandard_style,
    trivial_casts,
    trivial_numeric_casts
)]
#![allow(clippy::multiple_crate_versions)]

use std::error::Error;
use std::fmt;
use std::io;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Mutex;

use clap::{arg, crate_description, crate_name, crate_version, value_parser, ArgAction, ArgMatches, Command, ValueHint};
use clap_complete::aot::{generate, Generator, Shell};
use colored::Colorize;
use log::{debug, error, Level, LevelFilter, Metadata, Record};
use terminal_size::{terminal_size, Height, Width};

use crate::config::Config;
use crate::crm::allocator::CodeAllocator;
use crate::crm::manager::EntityManager;
use crate::crm::mutations::{Context, Mutations};
use crate::store::Backend;

mod config;
mod crm;
mod edit;
mod helper;
mod list;
mod prompt;
mod remove;
mod store;

struct SimpleLogger;

const DEFAULT_TERMINAL_SIZE: (usize, usize) = (80, 25);
const COMMAND_NOT_FOUND: &str = "Command not found";

impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Debug
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            if record.metadata().level() == Level::Error {
                eprintln!("{}", record.args());
            } else {
                println!("{}", record.args());
            }
        }
    }

    fn flush(&self) {}
}

static LOGGER: SimpleLogger = SimpleLogger;
static TERMINAL_SIZE: Mutex<(usize, usize)> = Mutex::new(DEFAULT_TERMINAL_SIZE);

fn get_command() -> Command {
    Command::new(crate_name!())
        .about(crate_description!())
        .subcommand_required(false)
        .arg_required_else_help(true)
        .version(crate_version!())
        .arg(
            arg!(-c --config <FILE> "Sets a custom config file")
                .global(true)
                .required(false)
                .display_order(100)
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            arg!(-u --user <ID> "Act as the given user instead of the configured one")
                .global(true)
                .required(false)
                .display_order(100),
        )
        .arg(
            arg!(-q --quiet "Do not output any message or ask for input")
                .global(true)
                .required(false)
                .display_order(100),
        )
        .arg(
            arg!(-v --verbose "Output more information")
                .global(true)
                .required(false)
                .display_order(100),
        )
        .arg(
            arg!(-d --debug "Output debug information")
                .global(true)
                .required(false)
                .display_order(100),
        )
        .arg(
            arg!(--completions <SHELL> "Output shell completions")
                .action(ArgAction::Set)
                .display_order(200)
                .value_parser(value_parser!(Shell)),
        )
        .subcommand(list::command_helper())
        .subcommand(edit::command_helper_edit())
        .subcommand(remove::command_helper())
        .subcommand(edit::command_helper_new())
}

fn print_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
}

fn get_log_level(matches: &ArgMatches) -> LevelFilter {
    if matches.get_flag("debug") {
        LevelFilter::Debug
    } else if matches.get_flag("verbose") {
        LevelFilter::Info
    } else if matches.get_flag("quiet") {
        LevelFilter::Off
    } else {
        LevelFilter::Warn
    }
}

fn main() -> ExitCode {
    let matches = get_command().get_matches();

    if let Some(generator) = matches.get_one::<Shell>("completions").copied() {
        let mut commands = get_command();
        print_completions(generator, &mut commands);
        return ExitCode::from(0);
    }

    if log::set_logger(&LOGGER)
        .map(|()| log::set_max_level(get_log_level(&matches)))
        .is_err()
    {
        eprintln!("Failed to set logger");
        return ExitCode::from(1);
    }

    if let Ok(mut size) = TERMINAL_SIZE.lock() {
        *size = terminal_size().map_or(DEFAULT_TERMINAL_SIZE, |(Width(w), Height(h))| (w as usize, h as usize));
    }

    match run(&matches) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{} {}", "\u{2716}".bright_red(), e);
            ExitCode::from(1)
        }
    }
}

fn run(matches: &ArgMatches) -> Result<u8, Box<dyn Error>> {
    let config = Config::try_from(matches)?;
    let backend = config.backend.as_deref().unwrap_or("");
    debug!("Using {} backend", if backend.is_empty() { "file" } else { backend });

    let store = Backend::from_str(backend)
        .map_err(|()| AppError(format!("No such backend is supported ({backend})")))?
        .open(&config)?;

    let allocator = CodeAllocator::new(store.as_ref()).max_attempts(config.code_attempts());
    let manager = EntityManager::with_allocator(store.as_ref(), allocator);
    let mutations = Mutations::new(&manager);
    let context = Context::new(config.user_id.clone());
    let quiet = matches.get_flag("quiet");

    match matches.subcommand() {
        Some((list::COMMAND_NAME, matches)) => list::command(matches, &mutations, quiet),
        Some((edit::COMMAND_NAME_EDIT, matches)) => edit::command_edit(matches, &mutations, &context, quiet),
        Some((remove::COMMAND_NAME, matches)) => remove::command(matches, &mutations, &context, quiet),
        Some((edit::COMMAND_NAME_NEW, matches)) => edit::command_new(matches, &mutations, &context, quiet),
        _ => Err(Box::new(CommandError::NotFound)),
    }
}

#[derive(Debug)]
enum CommandError {
    NotFound,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "{COMMAND_NOT_FOUND}"),
        }
    }
}

impl Error for CommandError {}

#[derive(Debug)]
pub struct AppError(pub String);

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Error for AppError {}

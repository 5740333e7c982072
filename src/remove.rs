use std::error::Error;

use clap::{arg, ArgMatches, Command};
use colored::Colorize;
use log::warn;

use crate::crm::brand::Brand;
use crate::crm::conversation::Conversation;
use crate::crm::deals::{Board, Deal, Pipeline, Stage};
use crate::crm::entity::Schema;
use crate::crm::integration::Integration;
use crate::crm::mutations::{Context, Mutations};
use crate::helper::{ask_for, get_id_input};
use crate::store::Filter;
use crate::CommandError;

pub const COMMAND_NAME: &str = "remove";

fn remove_helper<S: Schema>(about: &'static str) -> Command {
    Command::new(S::NAME).about(about)
}

pub fn command_helper() -> Command {
    Command::new(COMMAND_NAME)
        .visible_alias("delete")
        .short_flag('r')
        .arg(arg!(-i --id <ID> "id").global(true))
        .about("Remove entity")
        .subcommand_required(true)
        .subcommand(remove_helper::<Board>("Remove deal board"))
        .subcommand(remove_helper::<Pipeline>("Remove pipeline"))
        .subcommand(remove_helper::<Stage>("Remove stage"))
        .subcommand(remove_helper::<Deal>("Remove deal"))
        .subcommand(remove_helper::<Brand>("Remove brand"))
        .subcommand(remove_helper::<Integration>("Remove integration"))
        .subcommand(remove_helper::<Conversation>("Remove conversation"))
}

pub fn command(
    matches: &ArgMatches,
    mutations: &Mutations,
    context: &Context,
    quiet: bool,
) -> Result<u8, Box<dyn Error>> {
    context.check_login()?;

    let subcommand = matches.subcommand().ok_or(CommandError::NotFound)?;
    match subcommand.0 {
        Board::NAME => remove::<Board>(subcommand.1, mutations, context, quiet),
        Pipeline::NAME => remove::<Pipeline>(subcommand.1, mutations, context, quiet),
        Stage::NAME => remove::<Stage>(subcommand.1, mutations, context, quiet),
        Deal::NAME => remove::<Deal>(subcommand.1, mutations, context, quiet),
        Brand::NAME => remove::<Brand>(subcommand.1, mutations, context, quiet),
        Integration::NAME => remove::<Integration>(subcommand.1, mutations, context, quiet),
        Conversation::NAME => remove::<Conversation>(subcommand.1, mutations, context, quiet),
        _ => Err(Box::new(CommandError::NotFound)),
    }
}

fn remove<S: Schema>(
    matches: &ArgMatches,
    mutations: &Mutations,
    context: &Context,
    quiet: bool,
) -> Result<u8, Box<dyn Error>> {
    let manager = mutations.manager();
    let id = get_id_input("id", matches, quiet, Some(|| ask_for::<S>(manager, &Filter::new())))?;

    let removed = mutations.remove::<S>(context, &id)?;
    warn!(
        "{} {} {} removed",
        "\u{2714}".bright_green(),
        S::KIND,
        removed.fields.label().green()
    );

    Ok(0)
}

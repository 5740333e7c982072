use std::error::Error;

use clap::{ArgMatches, Command};
use colored::Colorize;
use log::warn;

use crate::crm::brand::Brand;
use crate::crm::conversation::Conversation;
use crate::crm::deals::{Board, Deal, Pipeline, Stage};
use crate::crm::entity::{Record, Schema};
use crate::crm::integration::Integration;
use crate::crm::mutations::{Context, Mutations};
use crate::CommandError;

mod board;
mod brand;
mod conversation;
mod deal;
mod integration;
mod integrations;
mod pipeline;
mod stage;

pub const COMMAND_NAME_EDIT: &str = "edit";
pub const COMMAND_NAME_NEW: &str = "new";

#[allow(clippy::module_name_repetitions)]
pub fn command_helper_edit() -> Command {
    Command::new(COMMAND_NAME_EDIT)
        .short_flag('e')
        .visible_aliases(["change"])
        .about("Edit entity")
        .subcommand_required(true)
        .subcommand(board::command_helper(false))
        .subcommand(pipeline::command_helper(false))
        .subcommand(stage::command_helper(false))
        .subcommand(deal::command_helper(false))
        .subcommand(brand::command_helper(false))
        .subcommand(integration::command_helper(false))
        .subcommand(integrations::command_helper())
        .subcommand(conversation::command_helper_edit())
}

#[allow(clippy::module_name_repetitions)]
pub fn command_edit(
    matches: &ArgMatches,
    mutations: &Mutations,
    context: &Context,
    quiet: bool,
) -> Result<u8, Box<dyn Error>> {
    let subcommand = matches.subcommand().ok_or(CommandError::NotFound)?;
    match subcommand.0 {
        Board::NAME => board::command(subcommand.1, mutations, context, quiet, false),
        Pipeline::NAME => pipeline::command(subcommand.1, mutations, context, quiet, false),
        Stage::NAME => stage::command(subcommand.1, mutations, context, quiet, false),
        Deal::NAME => deal::command(subcommand.1, mutations, context, quiet, false),
        Brand::NAME => brand::command(subcommand.1, mutations, context, quiet, false),
        Integration::NAME => integration::command(subcommand.1, mutations, context, quiet, false),
        integrations::COMMAND_NAME => integrations::command(subcommand.1, mutations, context, quiet),
        Conversation::NAME => conversation::command_edit(subcommand.1, mutations, context, quiet),
        _ => Err(Box::new(CommandError::NotFound)),
    }
}

pub fn command_helper_new() -> Command {
    Command::new(COMMAND_NAME_NEW)
        .visible_alias("add")
        .short_flag('n')
        .short_flag_alias('a')
        .about("Add a new entity")
        .subcommand_required(true)
        .subcommand(board::command_helper(true))
        .subcommand(pipeline::command_helper(true))
        .subcommand(stage::command_helper(true))
        .subcommand(deal::command_helper(true))
        .subcommand(brand::command_helper(true))
        .subcommand(integration::command_helper(true))
        .subcommand(conversation::command_helper())
}

pub fn command_new(
    matches: &ArgMatches,
    mutations: &Mutations,
    context: &Context,
    quiet: bool,
) -> Result<u8, Box<dyn Error>> {
    let subcommand = matches.subcommand().ok_or(CommandError::NotFound)?;
    match subcommand.0 {
        Board::NAME => board::command(subcommand.1, mutations, context, quiet, true),
        Pipeline::NAME => pipeline::command(subcommand.1, mutations, context, quiet, true),
        Stage::NAME => stage::command(subcommand.1, mutations, context, quiet, true),
        Deal::NAME => deal::command(subcommand.1, mutations, context, quiet, true),
        Brand::NAME => brand::command(subcommand.1, mutations, context, quiet, true),
        Integration::NAME => integration::command(subcommand.1, mutations, context, quiet, true),
        Conversation::NAME => conversation::command(subcommand.1, mutations, context, quiet),
        _ => Err(Box::new(CommandError::NotFound)),
    }
}

fn saved<S: Schema>(record: &Record<S>) -> Result<u8, Box<dyn Error>> {
    warn!(
        "{} {} {} ({}) saved!",
        "\u{2714}".bright_green(),
        S::KIND,
        record.fields.label().green(),
        record.id
    );

    Ok(0)
}

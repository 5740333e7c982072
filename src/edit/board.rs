use std::error::Error;

use clap::{arg, ArgMatches, Command};
use log::info;

use crate::crm::deals::{Board, BoardPatch};
use crate::crm::entity::Schema;
use crate::crm::mutations::{Context, Mutations};
use crate::edit::saved;
use crate::helper::{ask_for, get_id_input};
use crate::prompt::{changed, get_match_string};
use crate::store::Filter;

pub fn command_helper(new: bool) -> Command {
    let command = Command::new(Board::NAME)
        .about(if new { "Add deal board" } else { "Edit deal board" })
        .arg(arg!(-n --name <NAME> "Board name").required(false));

    if new {
        command
    } else {
        command.arg(arg!(-i --id <ID> "Board ID").required(false))
    }
}

pub fn command(
    matches: &ArgMatches,
    mutations: &Mutations,
    context: &Context,
    quiet: bool,
    new: bool,
) -> Result<u8, Box<dyn Error>> {
    context.check_login()?;

    if new {
        let board = Board {
            name: get_match_string(matches, quiet, "name", "Name: ", "", true),
        };

        return saved(&mutations.add(context, board)?);
    }

    let manager = mutations.manager();
    let id = get_id_input("id", matches, quiet, Some(|| ask_for::<Board>(manager, &Filter::new())))?;
    let board = manager.get_by_id_or_fail::<Board>(&id)?;

    let patch = BoardPatch {
        name: changed(
            get_match_string(matches, quiet, "name", "Name: ", &board.fields.name, true),
            &board.fields.name,
        ),
    };

    info!("Trying to edit board {id}");
    saved(&mutations.edit::<Board>(context, &id, &patch)?)
}

use std::error::Error;

use clap::{arg, ArgMatches, Command};
use log::info;

use crate::crm::deals::{Board, Pipeline, PipelinePatch};
use crate::crm::entity::Schema;
use crate::crm::mutations::{Context, Mutations};
use crate::edit::saved;
use crate::helper::{ask_for, get_id_input};
use crate::prompt::{changed, changed_flag, get_match_string};
use crate::store::Filter;

pub fn command_helper(new: bool) -> Command {
    let command = Command::new(Pipeline::NAME)
        .about(if new { "Add pipeline to a board" } else { "Edit pipeline" })
        .arg(arg!(-n --name <NAME> "Pipeline name").required(false))
        .arg(arg!(-b --board <ID> "Board the pipeline belongs to").required(false));

    if new {
        command
    } else {
        command.arg(arg!(-i --id <ID> "Pipeline ID").required(false))
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
    let manager = mutations.manager();

    if new {
        let name = get_match_string(matches, quiet, "name", "Name: ", "", true);
        let board_id = get_id_input("board", matches, quiet, Some(|| ask_for::<Board>(manager, &Filter::new())))?;

        return saved(&mutations.add(context, Pipeline { name, board_id })?);
    }

    let id = get_id_input("id", matches, quiet, Some(|| ask_for::<Pipeline>(manager, &Filter::new())))?;
    let pipeline = manager.get_by_id_or_fail::<Pipeline>(&id)?;

    let patch = PipelinePatch {
        name: changed(
            get_match_string(matches, quiet, "name", "Name: ", &pipeline.fields.name, true),
            &pipeline.fields.name,
        ),
        board_id: changed_flag(matches, "board", Some(pipeline.fields.board_id.as_str())),
    };

    info!("Trying to edit pipeline {id}");
    saved(&mutations.edit::<Pipeline>(context, &id, &patch)?)
}

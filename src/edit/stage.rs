use std::error::Error;

use clap::{arg, value_parser, ArgMatches, Command};
use log::info;

use crate::crm::deals::{Pipeline, Stage, StagePatch, BOARD_ID};
use crate::crm::entity::Schema;
use crate::crm::mutations::{Context, Mutations};
use crate::edit::saved;
use crate::helper::{ask_for, get_id_input};
use crate::prompt::{changed, changed_flag, get_match_string};
use crate::store::Filter;

pub fn command_helper(new: bool) -> Command {
    let command = Command::new(Stage::NAME)
        .about(if new { "Add stage to a pipeline" } else { "Edit stage" })
        .arg(arg!(-n --name <NAME> "Stage name").required(false))
        .arg(arg!(-p --pipeline <ID> "Pipeline the stage belongs to").required(false))
        .arg(arg!(-b --board <ID> "Board the stage belongs to").required(false))
        .arg(
            arg!(--probability <PERCENT> "Chance of winning a deal in this stage")
                .required(false)
                .value_parser(value_parser!(u8).range(0..=100)),
        );

    if new {
        command
    } else {
        command.arg(arg!(-i --id <ID> "Stage ID").required(false))
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
    let board_id = matches.get_one::<String>("board").cloned();
    let probability = matches.get_one::<u8>("probability").copied();

    if new {
        let name = get_match_string(matches, quiet, "name", "Name: ", "", true);
        let pipelines = board_id
            .as_deref()
            .map_or_else(Filter::new, |board_id| Filter::new().eq(BOARD_ID, board_id));
        let pipeline_id = get_id_input("pipeline", matches, quiet, Some(|| ask_for::<Pipeline>(manager, &pipelines)))?;

        let stage = Stage {
            name,
            pipeline_id,
            board_id,
            probability,
        };

        return saved(&mutations.add(context, stage)?);
    }

    let id = get_id_input("id", matches, quiet, Some(|| ask_for::<Stage>(manager, &Filter::new())))?;
    let stage = manager.get_by_id_or_fail::<Stage>(&id)?;

    let patch = StagePatch {
        name: changed(
            get_match_string(matches, quiet, "name", "Name: ", &stage.fields.name, true),
            &stage.fields.name,
        ),
        pipeline_id: changed_flag(matches, "pipeline", Some(stage.fields.pipeline_id.as_str())),
        board_id: changed_flag(matches, "board", stage.fields.board_id.as_deref()),
        probability: probability.filter(|probability| Some(*probability) != stage.fields.probability),
    };

    info!("Trying to edit stage {id}");
    saved(&mutations.edit::<Stage>(context, &id, &patch)?)
}

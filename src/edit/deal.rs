use std::error::Error;

use chrono::{DateTime, Utc};
use clap::{arg, value_parser, ArgAction, ArgMatches, Command};
use log::info;

use crate::crm::deals::{Deal, DealPatch, Stage, PIPELINE_ID};
use crate::crm::entity::Schema;
use crate::crm::mutations::{Context, Mutations};
use crate::edit::saved;
use crate::helper::{ask_for, get_id_input, parse_date};
use crate::prompt::{changed, changed_flag, get_match_string};
use crate::store::Filter;

pub fn command_helper(new: bool) -> Command {
    let command = Command::new(Deal::NAME)
        .about(if new { "Add deal to a stage" } else { "Edit deal" })
        .arg(arg!(-s --stage <ID> "Stage the deal sits in").required(false))
        .arg(arg!(-p --pipeline <ID> "Pipeline of the deal").required(false))
        .arg(arg!(-b --board <ID> "Board of the deal").required(false))
        .arg(arg!(-o --company <ID> "Company the deal is with").required(false))
        .arg(
            arg!(--amount <AMOUNT> "Deal value")
                .required(false)
                .value_parser(value_parser!(f64)),
        )
        .arg(
            arg!(--"close-date" <DATE> "Expected close date as YYYY-MM-DD")
                .required(false)
                .value_parser(parse_date),
        )
        .arg(arg!(-t --note <NOTE> "Note").required(false))
        .arg(
            arg!(--product <ID> "Product in the deal, repeat for more")
                .required(false)
                .action(ArgAction::Append),
        )
        .arg(
            arg!(--assign <USER> "User working the deal, repeat for more")
                .required(false)
                .action(ArgAction::Append),
        );

    if new {
        command
    } else {
        command.arg(arg!(-i --id <ID> "Deal ID").required(false))
    }
}

fn get_many(matches: &ArgMatches, id: &str) -> Option<Vec<String>> {
    matches.get_many::<String>(id).map(|values| values.cloned().collect())
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
    let pipeline_id = matches.get_one::<String>("pipeline").cloned();
    let amount = matches.get_one::<f64>("amount").copied();
    let close_date = matches.get_one::<DateTime<Utc>>("close-date").copied();

    if new {
        let stages = pipeline_id
            .as_deref()
            .map_or_else(Filter::new, |pipeline_id| Filter::new().eq(PIPELINE_ID, pipeline_id));
        let stage_id = get_id_input("stage", matches, quiet, Some(|| ask_for::<Stage>(manager, &stages)))?;
        let note = get_match_string(matches, quiet, "note", "Note: ", "", false);

        let deal = Deal {
            stage_id,
            board_id: matches.get_one::<String>("board").cloned(),
            pipeline_id,
            product_ids: get_many(matches, "product").unwrap_or_default(),
            company_id: matches.get_one::<String>("company").cloned(),
            amount,
            close_date,
            note: Some(note).filter(|note| !note.is_empty()),
            assigned_user_ids: get_many(matches, "assign").unwrap_or_default(),
        };

        return saved(&mutations.add(context, deal)?);
    }

    let id = get_id_input("id", matches, quiet, Some(|| ask_for::<Deal>(manager, &Filter::new())))?;
    let deal = manager.get_by_id_or_fail::<Deal>(&id)?;
    let note = deal.fields.note.as_deref().unwrap_or("");

    let patch = DealPatch {
        stage_id: changed_flag(matches, "stage", Some(deal.fields.stage_id.as_str())),
        board_id: changed_flag(matches, "board", deal.fields.board_id.as_deref()),
        pipeline_id: changed_flag(matches, "pipeline", deal.fields.pipeline_id.as_deref()),
        product_ids: get_many(matches, "product"),
        company_id: changed_flag(matches, "company", deal.fields.company_id.as_deref()),
        amount,
        close_date,
        note: changed(get_match_string(matches, quiet, "note", "Note: ", note, false), note),
        assigned_user_ids: get_many(matches, "assign"),
    };

    info!("Trying to edit deal {id}");
    saved(&mutations.edit::<Deal>(context, &id, &patch)?)
}

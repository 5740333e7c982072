use std::error::Error;

use clap::{arg, value_parser, ArgMatches, Command};
use log::info;

use crate::crm::entity::Schema;
use crate::crm::integration::{Integration, IntegrationKind, IntegrationPatch};
use crate::crm::mutations::{Context, Mutations};
use crate::edit::saved;
use crate::helper::{ask_for, get_id_input};
use crate::prompt::{changed, changed_flag, get_match_string};
use crate::store::Filter;

pub fn command_helper(new: bool) -> Command {
    let command = Command::new(Integration::NAME)
        .about(if new { "Add integration" } else { "Edit integration" })
        .arg(arg!(-n --name <NAME> "Integration name").required(false))
        .arg(arg!(-b --brand <ID> "Brand the integration belongs to").required(false));

    if new {
        command.arg(
            arg!(-k --kind <KIND> "Channel the integration connects")
                .required(false)
                .default_value("messenger")
                .value_parser(value_parser!(IntegrationKind)),
        )
    } else {
        command.arg(arg!(-i --id <ID> "Integration ID").required(false))
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
        let integration = Integration {
            name: get_match_string(matches, quiet, "name", "Name: ", "", true),
            kind: matches.get_one::<IntegrationKind>("kind").copied().unwrap_or_default(),
            brand_id: matches.get_one::<String>("brand").cloned(),
        };

        return saved(&mutations.add(context, integration)?);
    }

    let manager = mutations.manager();
    let id = get_id_input("id", matches, quiet, Some(|| ask_for::<Integration>(manager, &Filter::new())))?;
    let integration = manager.get_by_id_or_fail::<Integration>(&id)?;

    let patch = IntegrationPatch {
        name: changed(
            get_match_string(matches, quiet, "name", "Name: ", &integration.fields.name, true),
            &integration.fields.name,
        ),
        brand_id: changed_flag(matches, "brand", integration.fields.brand_id.as_deref()),
    };

    info!("Trying to edit integration {id}");
    saved(&mutations.edit::<Integration>(context, &id, &patch)?)
}

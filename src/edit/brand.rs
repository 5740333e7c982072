use std::error::Error;

use clap::{arg, value_parser, ArgMatches, Command};
use log::info;

use crate::crm::brand::{Brand, BrandPatch, EmailConfig, EmailKind};
use crate::crm::entity::Schema;
use crate::crm::mutations::{Context, Mutations};
use crate::edit::saved;
use crate::helper::{ask_for, get_id_input};
use crate::prompt::{changed, changed_flag, get_match_string};
use crate::store::Filter;

pub fn command_helper(new: bool) -> Command {
    let command = Command::new(Brand::NAME)
        .about(if new { "Add brand" } else { "Edit brand" })
        .arg(arg!(-n --name <NAME> "Brand name").required(false))
        .arg(arg!(-e --description <DESCRIPTION> "Description").required(false))
        .arg(arg!(--code <CODE> "Preferred brand code, a free one is generated when taken").required(false))
        .arg(
            arg!(--"email-type" <TYPE> "How emails of the brand are rendered")
                .required(false)
                .value_parser(value_parser!(EmailKind)),
        )
        .arg(
            arg!(--template <TEMPLATE> "Template for custom emails")
                .required(false)
                .requires("email-type"),
        );

    if new {
        command
    } else {
        command.arg(arg!(-i --id <ID> "Brand ID").required(false))
    }
}

fn get_email_config(matches: &ArgMatches) -> Option<EmailConfig> {
    matches.get_one::<EmailKind>("email-type").map(|kind| EmailConfig {
        kind: *kind,
        template: matches.get_one::<String>("template").cloned(),
    })
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
        let description = get_match_string(matches, quiet, "description", "Description: ", "", false);
        let brand = Brand {
            name: get_match_string(matches, quiet, "name", "Name: ", "", true),
            description: Some(description).filter(|description| !description.is_empty()),
            code: matches.get_one::<String>("code").cloned(),
            email_config: get_email_config(matches),
        };

        return saved(&mutations.add(context, brand)?);
    }

    let manager = mutations.manager();
    let id = get_id_input("id", matches, quiet, Some(|| ask_for::<Brand>(manager, &Filter::new())))?;
    let brand = manager.get_by_id_or_fail::<Brand>(&id)?;
    let description = brand.fields.description.as_deref().unwrap_or("");

    let patch = BrandPatch {
        name: changed(
            get_match_string(matches, quiet, "name", "Name: ", &brand.fields.name, true),
            &brand.fields.name,
        ),
        description: changed(
            get_match_string(matches, quiet, "description", "Description: ", description, false),
            description,
        ),
        code: changed_flag(matches, "code", brand.fields.code.as_deref()),
        email_config: get_email_config(matches).filter(|config| Some(config) != brand.fields.email_config.as_ref()),
    };

    info!("Trying to edit brand {id}");
    saved(&mutations.edit::<Brand>(context, &id, &patch)?)
}

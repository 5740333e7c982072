use std::error::Error;

use clap::{arg, Arg, ArgMatches, Command};
use colored::Colorize;
use log::warn;

use crate::crm::brand::Brand;
use crate::crm::mutations::{Context, Mutations};
use crate::helper::{ask_for, get_id_input};
use crate::store::Filter;

pub const COMMAND_NAME: &str = "integrations";

pub fn command_helper() -> Command {
    Command::new(COMMAND_NAME)
        .about("Attach integrations to a brand")
        .arg(arg!(-b --brand <ID> "Brand to attach the integrations to").required(false))
        .arg(
            Arg::new("ids")
                .value_name("INTEGRATION_ID")
                .help("Integrations to move")
                .num_args(1..)
                .required(true),
        )
}

pub fn command(
    matches: &ArgMatches,
    mutations: &Mutations,
    context: &Context,
    quiet: bool,
) -> Result<u8, Box<dyn Error>> {
    context.check_login()?;
    let manager = mutations.manager();

    let brand_id = get_id_input("brand", matches, quiet, Some(|| ask_for::<Brand>(manager, &Filter::new())))?;
    let ids: Vec<String> = matches
        .get_many::<String>("ids")
        .map(|ids| ids.cloned().collect())
        .unwrap_or_default();

    let integrations = mutations.brands_manage_integrations(context, &brand_id, &ids)?;
    if integrations.len() < ids.len() {
        warn!(
            "{} {} of {} integrations were not found",
            "\u{2716}".bright_red(),
            ids.len() - integrations.len(),
            ids.len()
        );
    }

    for integration in &integrations {
        warn!("{} {integration}", "\u{2714}".bright_green());
    }
    warn!(
        "{} {} integration(s) now belong to brand {}",
        "\u{2714}".bright_green(),
        integrations.len(),
        brand_id.green()
    );

    Ok(0)
}

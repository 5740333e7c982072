use std::cmp;
use std::collections::HashMap;
use std::error::Error;

use clap::{Arg, ArgMatches, Command};
use colored::Colorize;
use log::warn;
use term_table::row::Row;
use term_table::table_cell::{Alignment, TableCell};
use term_table::{Table, TableStyle};

use crate::crm::brand::Brand;
use crate::crm::conversation::Conversation;
use crate::crm::deals::{Board, Deal, Pipeline, Stage};
use crate::crm::entity::{Record, Schema};
use crate::crm::integration::Integration;
use crate::crm::manager::EntityManager;
use crate::crm::mutations::Mutations;
use crate::store::Filter;
use crate::{CommandError, DEFAULT_TERMINAL_SIZE, TERMINAL_SIZE};

pub const COMMAND_NAME: &str = "list";
const CODE: &str = "code";

fn list_helper<S: Schema>(about: &'static str) -> Command {
    let command = S::PARENTS.iter().fold(Command::new(S::NAME).about(about), |command, parent| {
        command.arg(
            Arg::new(parent.name)
                .long(parent.name)
                .value_name("ID")
                .help(format!("Only records of this {}", parent.name)),
        )
    });

    if S::CODED {
        command.arg(Arg::new(CODE).long(CODE).help("Look up by code"))
    } else {
        command
    }
}

pub fn command_helper() -> Command {
    Command::new(COMMAND_NAME)
        .about("List entities")
        .short_flag('l')
        .short_flag_alias('f')
        .visible_aliases(["find"])
        .subcommand_required(true)
        .subcommand(list_helper::<Board>("List deal boards"))
        .subcommand(list_helper::<Pipeline>("List pipelines"))
        .subcommand(list_helper::<Stage>("List stages"))
        .subcommand(list_helper::<Deal>("List deals"))
        .subcommand(list_helper::<Brand>("List brands"))
        .subcommand(list_helper::<Integration>("List integrations"))
        .subcommand(list_helper::<Conversation>("List conversations"))
}

pub fn command(matches: &ArgMatches, mutations: &Mutations, quiet: bool) -> Result<u8, Box<dyn Error>> {
    let manager = mutations.manager();
    let subcommand = matches.subcommand().ok_or(CommandError::NotFound)?;
    match subcommand.0 {
        Board::NAME => list::<Board>(subcommand.1, manager, quiet),
        Pipeline::NAME => list::<Pipeline>(subcommand.1, manager, quiet),
        Stage::NAME => list::<Stage>(subcommand.1, manager, quiet),
        Deal::NAME => list::<Deal>(subcommand.1, manager, quiet),
        Brand::NAME => list::<Brand>(subcommand.1, manager, quiet),
        Integration::NAME => list::<Integration>(subcommand.1, manager, quiet),
        Conversation::NAME => list::<Conversation>(subcommand.1, manager, quiet),
        _ => Err(Box::new(CommandError::NotFound)),
    }
}

fn get_filter<S: Schema>(matches: &ArgMatches) -> Filter {
    S::PARENTS.iter().fold(Filter::new(), |filter, parent| {
        match matches.get_one::<String>(parent.name) {
            Some(id) => filter.eq(parent.field, id.as_str()),
            None => filter,
        }
    })
}

fn list<S: Schema>(matches: &ArgMatches, manager: &EntityManager, quiet: bool) -> Result<u8, Box<dyn Error>> {
    let code = if S::CODED {
        matches.get_one::<String>(CODE)
    } else {
        None
    };

    let records = match code {
        Some(code) => vec![manager.get_by_code::<S>(code)?],
        None => manager.find::<S>(&get_filter::<S>(matches))?,
    };

    if records.is_empty() {
        warn!("{} No {} found", "\u{2716}".bright_red(), S::KIND.to_lowercase());
        return Ok(1);
    }

    if !quiet {
        warn!("{}", print_table(&records));
    }

    Ok(0)
}

fn print_table<S: Schema>(records: &[Record<S>]) -> String {
    let mut table = Table::new();
    let terminal_width = TERMINAL_SIZE.lock().map_or(DEFAULT_TERMINAL_SIZE.0, |size| size.0);
    let width = [terminal_width * 24 / 100, terminal_width * 32 / 100, terminal_width * 22 / 100];

    table.max_column_widths = HashMap::from([
        (0, width[0]),
        (
            1,
            cmp::max(terminal_width * 22 / 100, terminal_width - width.iter().sum::<usize>()),
        ),
        (2, width[1]),
        (3, width[2]),
    ]);
    table.style = TableStyle::rounded();

    let header = vec![
        TableCell::new("Id".green()),
        TableCell::new(S::KIND.green()),
        TableCell::new("Parents".green()),
        TableCell::new("Created".green()),
    ];

    table.add_row(Row::new(vec![TableCell::builder(
        format!("{} {}(s)", records.len(), S::KIND.to_lowercase()).green(),
    )
    .alignment(Alignment::Center)
    .col_span(header.len())
    .build()]));
    table.add_row(Row::new(header));

    for record in records {
        let parents = record
            .parent_ids()
            .iter()
            .map(|(name, id)| format!("{name}: {id}"))
            .collect::<Vec<String>>()
            .join("\n");

        table.add_row(Row::new(vec![
            TableCell::new(&record.id),
            TableCell::new(record.fields.label()),
            TableCell::new(parents),
            TableCell::new(record.created_at.format("%Y-%m-%d %H:%M")),
        ]));
    }

    table.render()
}

#[cfg(test)]
mod tests {
    use clap::Command;

    use crate::crm::brand::Brand;
    use crate::crm::deals::{Deal, Pipeline};
    use crate::crm::entity::Record;
    use crate::list::{get_filter, list_helper, print_table};
    use crate::store::Filter;

    #[test]
    fn test_print_table() {
        let records = vec![
            Record::new(
                "p1".to_owned(),
                "u1",
                Pipeline {
                    name: "Leads".to_owned(),
                    board_id: "b1".to_owned(),
                },
            ),
            Record::new(
                "p2".to_owned(),
                "u1",
                Pipeline {
                    name: "Renewals".to_owned(),
                    board_id: "b2".to_owned(),
                },
            ),
        ];

        let output = String::from_utf8(strip_ansi_escapes::strip(print_table(&records))).expect("Utf8");

        assert!(output.contains("2 pipeline(s)"));
        assert!(output.contains("Leads"));
        assert!(output.contains("Renewals"));
        assert!(output.contains("board: b1"));
        assert!(output.contains("board: b2"));
    }

    #[test]
    fn test_parent_filters() {
        let command = Command::new("list").subcommand(list_helper::<Deal>("List deals"));
        let matches = command.get_matches_from(["list", "deal", "--stage", "s1", "--board", "b1"]);
        let (_, matches) = matches.subcommand().expect("Subcommand");

        assert_eq!(
            Filter::new().eq("boardId", "b1").eq("stageId", "s1"),
            get_filter::<Deal>(matches)
        );
    }

    #[test]
    fn test_code_only_for_coded() {
        assert!(list_helper::<Brand>("List brands")
            .get_arguments()
            .any(|arg| arg.get_id() == "code"));
        assert!(!list_helper::<Pipeline>("List pipelines")
            .get_arguments()
            .any(|arg| arg.get_id() == "code"));
    }
}

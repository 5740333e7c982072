use std::error::Error;

use clap::{arg, value_parser, ArgAction, ArgMatches, Command};
use colored::Colorize;
use log::warn;

use crate::crm::conversation::{Conversation, ConversationPatch, ConversationStatus};
use crate::crm::entity::Schema;
use crate::crm::integration::Integration;
use crate::crm::mutations::{Context, Mutations};
use crate::edit::saved;
use crate::helper::{ask_for, get_id_input};
use crate::prompt::get_match_string;
use crate::store::Filter;

pub fn command_helper() -> Command {
    Command::new(Conversation::NAME)
        .about("Add conversation to an integration")
        .arg(arg!(-t --content <CONTENT> "First message").required(false))
        .arg(arg!(-g --integration <ID> "Integration the conversation came through").required(false))
        .arg(arg!(--customer <ID> "Customer taking part").required(false))
        .arg(
            arg!(--status <STATUS> "Initial status, open or closed")
                .required(false)
                .value_parser(value_parser!(ConversationStatus)),
        )
}

#[allow(clippy::module_name_repetitions)]
pub fn command_helper_edit() -> Command {
    Command::new(Conversation::NAME)
        .about("Edit, resolve or reopen a conversation. Toggles the status unless something else changes")
        .arg(arg!(-i --id <ID> "Conversation ID").required(false))
        .arg(arg!(-t --content <CONTENT> "New message").required(false))
        .arg(arg!(-g --integration <ID> "Move to another integration").required(false))
        .arg(
            arg!(--status <STATUS> "New status, open or closed")
                .required(false)
                .value_parser(value_parser!(ConversationStatus)),
        )
        .arg(
            arg!(--toggle "Flip the current status")
                .action(ArgAction::SetTrue)
                .conflicts_with("status"),
        )
}

/// `Some(None)` toggles, `Some(Some(status))` sets, `None` leaves the status alone.
fn status_change(matches: &ArgMatches) -> Option<Option<ConversationStatus>> {
    if let Some(status) = matches.get_one::<ConversationStatus>("status") {
        return Some(Some(*status));
    }

    let other_changes =
        matches.get_one::<String>("content").is_some() || matches.get_one::<String>("integration").is_some();
    (matches.get_flag("toggle") || !other_changes).then_some(None)
}

pub fn command(
    matches: &ArgMatches,
    mutations: &Mutations,
    context: &Context,
    quiet: bool,
) -> Result<u8, Box<dyn Error>> {
    context.check_login()?;
    let manager = mutations.manager();

    let content = get_match_string(matches, quiet, "content", "Message: ", "", true);
    let integration_id =
        get_id_input("integration", matches, quiet, Some(|| ask_for::<Integration>(manager, &Filter::new())))?;

    let conversation = Conversation {
        content,
        integration_id,
        status: matches.get_one::<ConversationStatus>("status").copied().unwrap_or_default(),
        customer_id: matches.get_one::<String>("customer").cloned(),
    };

    saved(&mutations.add(context, conversation)?)
}

#[allow(clippy::module_name_repetitions)]
pub fn command_edit(
    matches: &ArgMatches,
    mutations: &Mutations,
    context: &Context,
    quiet: bool,
) -> Result<u8, Box<dyn Error>> {
    context.check_login()?;
    let manager = mutations.manager();

    let id = get_id_input("id", matches, quiet, Some(|| ask_for::<Conversation>(manager, &Filter::new())))?;

    let patch = ConversationPatch {
        content: matches.get_one::<String>("content").cloned(),
        integration_id: matches.get_one::<String>("integration").cloned(),
        status: None,
    };
    if patch.content.is_some() || patch.integration_id.is_some() {
        saved(&mutations.edit::<Conversation>(context, &id, &patch)?)?;
    }

    if let Some(status) = status_change(matches) {
        let conversation = mutations.conversations_change_status(context, &id, status)?;
        warn!(
            "{} Conversation {} is now {}",
            "\u{2714}".bright_green(),
            conversation.id,
            conversation.fields.status.to_string().green()
        );
    }

    Ok(0)
}

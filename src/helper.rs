use std::error::Error;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::ArgMatches;
use dialoguer::theme::ColorfulTheme;
use dialoguer::FuzzySelect;
use log::warn;

use crate::crm::entity::Schema;
use crate::crm::manager::EntityManager;
use crate::store::Filter;
use crate::AppError;

/// Id from `field`, asking through `callback` when it is missing and input is allowed.
pub fn get_id_input<F>(field: &str, matches: &ArgMatches, quiet: bool, callback: Option<F>) -> Result<String, Box<dyn Error>>
where
    F: FnOnce() -> Result<String, Box<dyn Error>>,
{
    if let Some(id) = matches.get_one::<String>(field).filter(|id| !id.is_empty()) {
        return Ok(id.clone());
    }

    match callback {
        Some(callback) if !quiet => callback(),
        _ => {
            warn!("Could not ask for input");
            Err(Box::new(AppError(format!("No {field} id given"))))
        }
    }
}

pub fn ask_for<S: Schema>(manager: &EntityManager, filter: &Filter) -> Result<String, Box<dyn Error>> {
    let records = manager.find::<S>(filter)?;
    if records.is_empty() {
        Err(AppError(format!("No {} found", S::KIND.to_lowercase())))?;
    }

    let count = records.len();
    let selection = FuzzySelect::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("Select the right {} ({count} found)", S::KIND.to_lowercase()))
        .items(&records)
        .default(0)
        .max_length(10)
        .interact_opt()?;

    match selection {
        Some(index) => Ok(records[index].id.clone()),
        None => Err(Box::new(AppError("Cancelled".to_owned()))),
    }
}

/// Parses `YYYY-MM-DD` as midnight UTC.
pub fn parse_date(input: &str) -> Result<DateTime<Utc>, String> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .map_err(|error| format!("{input} is not a YYYY-MM-DD date: {error}"))
}

use std::process;

use clap::ArgMatches;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Input;
use log::error;

#[allow(clippy::module_name_repetitions)]
pub fn ask_prompt(text: &str, required: bool, default: &str) -> String {
    let theme = ColorfulTheme::default();
    let mut prompt = Input::<String>::with_theme(&theme)
        .with_prompt(text)
        .allow_empty(!required);

    if !default.is_empty() {
        prompt = prompt.default(default.to_owned());
    }

    prompt.interact_text().unwrap_or_else(|_| {
        error!("Cancelled");
        process::exit(1);
    })
}

pub fn get_match_string(
    matches: &ArgMatches,
    quiet: bool,
    match_id: &str,
    prompt_text: &str,
    default: &str,
    required: bool,
) -> String {
    if let Some(value) = matches.get_one::<String>(match_id) {
        if value.is_empty() && !quiet {
            ask_prompt(prompt_text, required, default)
        } else {
            value.clone()
        }
    } else {
        if !quiet {
            return ask_prompt(prompt_text, required, default);
        }

        default.to_owned()
    }
}

/// `Some` only when the answer differs from what is stored.
pub fn changed(value: String, current: &str) -> Option<String> {
    (value != current).then_some(value)
}

/// Flag value for a patch field, `None` when the flag is absent or repeats the stored value.
pub fn changed_flag(matches: &ArgMatches, match_id: &str, current: Option<&str>) -> Option<String> {
    matches
        .get_one::<String>(match_id)
        .filter(|value| Some(value.as_str()) != current)
        .cloned()
}

#[cfg(test)]
mod tests {
    use clap::{arg, Command};
    use test_case::test_case;

    use crate::prompt::{changed, changed_flag, get_match_string};

    fn command() -> Command {
        Command::new("test")
            .arg(arg!(-n --name <NAME> "Name").required(false))
            .arg(arg!(--board <ID> "Board").required(false))
    }

    #[test_case(&["test", "-n", "Sales"], "Sales"; "given")]
    #[test_case(&["test"], "Default"; "default")]
    #[test_case(&["test", "-n", ""], ""; "empty")]
    fn test_get_match_string_quiet(args: &[&str], result: &str) {
        let matches = command().get_matches_from(args);

        assert_eq!(result, get_match_string(&matches, true, "name", "Name: ", "Default", true));
    }

    #[test]
    fn test_changed() {
        assert_eq!(None, changed("Sales".to_owned(), "Sales"));
        assert_eq!(Some("Leads".to_owned()), changed("Leads".to_owned(), "Sales"));
    }

    #[test_case(&["test"], Some("b1"), None)]
    #[test_case(&["test", "--board", "b1"], Some("b1"), None)]
    #[test_case(&["test", "--board", "b2"], Some("b1"), Some("b2"))]
    #[test_case(&["test", "--board", "b2"], None, Some("b2"))]
    fn test_changed_flag(args: &[&str], current: Option<&str>, result: Option<&str>) {
        let matches = command().get_matches_from(args);

        assert_eq!(result.map(ToOwned::to_owned), changed_flag(&matches, "board", current));
    }
}

//! Command palette: available commands, autocomplete and parsing.

use chrono::NaiveDate;

use crate::filters::{parse_date_arg, DatePreset};
use crate::tabs::Tab;

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "clients",
    aliases: &["c"],
    description: "Profitability per client",
  },
  Command {
    name: "monthly",
    aliases: &["m", "months"],
    description: "Monthly totals and trends",
  },
  Command {
    name: "performance",
    aliases: &["perf", "team"],
    description: "Estimated performance per employee",
  },
  Command {
    name: "hours",
    aliases: &["h"],
    description: "Hours per employee and client",
  },
  Command {
    name: "client",
    aliases: &["detail", "timeline"],
    description: "Timeline for one client",
  },
  Command {
    name: "planning",
    aliases: &["budget", "budgets"],
    description: "Monthly budget progress",
  },
  Command {
    name: "health",
    aliases: &["status", "sources"],
    description: "Freshness of each data source",
  },
  Command {
    name: "campaigns",
    aliases: &["ads", "analytics"],
    description: "Paid media results per client",
  },
  Command {
    name: "alerts",
    aliases: &["a"],
    description: "Clients needing attention",
  },
  Command {
    name: "preset",
    aliases: &["period"],
    description: "preset <7days|30days|90days|lastmonth|ytd|all>",
  },
  Command {
    name: "range",
    aliases: &["dates"],
    description: "range <from> <to> (YYYY-MM-DD, - for open)",
  },
  Command {
    name: "refresh",
    aliases: &["r", "reload"],
    description: "Clear cached data and reload",
  },
  Command {
    name: "logout",
    aliases: &["signout"],
    description: "Forget the session and exit",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit tally",
  },
];

/// Get autocomplete suggestions for a given input. Only the first word is
/// matched; arguments are left alone.
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input
    .split_whitespace()
    .next()
    .unwrap_or("")
    .to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in COMMANDS {
    if cmd.name == input_lower {
      matches.push((cmd, 0));
      continue;
    }

    if cmd.aliases.contains(&input_lower.as_str()) {
      matches.push((cmd, 1));
      continue;
    }

    if cmd.name.starts_with(&input_lower) {
      matches.push((cmd, 2));
      continue;
    }

    if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      matches.push((cmd, 3));
      continue;
    }

    if cmd.name.contains(&input_lower) {
      matches.push((cmd, 4));
      continue;
    }

    if cmd.aliases.iter().any(|a| a.contains(&input_lower)) {
      matches.push((cmd, 5));
    }
  }

  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

/// What a submitted command asks the app to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
  SwitchTab(Tab),
  Preset(DatePreset),
  Range(Option<NaiveDate>, Option<NaiveDate>),
  Refresh,
  Logout,
  Quit,
}

/// Parse a submitted command line. The command word may be an alias.
pub fn parse(line: &str) -> Result<Action, String> {
  let mut words = line.split_whitespace();
  let word = words.next().ok_or_else(|| "empty command".to_string())?.to_lowercase();
  let args: Vec<&str> = words.collect();

  let name = COMMANDS
    .iter()
    .find(|c| c.name == word || c.aliases.contains(&word.as_str()))
    .map(|c| c.name)
    .ok_or_else(|| format!("unknown command '{}'", word))?;

  if let Some(tab) = Tab::from_command(name) {
    return Ok(Action::SwitchTab(tab));
  }

  match name {
    "preset" => {
      let [preset] = args.as_slice() else {
        return Err("usage: preset <name>".to_string());
      };
      DatePreset::from_name(preset)
        .map(Action::Preset)
        .ok_or_else(|| format!("unknown preset '{}'", preset))
    }
    "range" => {
      let [from, to] = args.as_slice() else {
        return Err("usage: range <from> <to>".to_string());
      };
      Ok(Action::Range(parse_date_arg(from)?, parse_date_arg(to)?))
    }
    "refresh" => Ok(Action::Refresh),
    "logout" => Ok(Action::Logout),
    _ => Ok(Action::Quit),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match_beats_prefix() {
    let suggestions = get_suggestions("client");
    assert_eq!(suggestions[0].name, "client");
    assert_eq!(suggestions[1].name, "clients");
  }

  #[test]
  fn test_alias_match() {
    let suggestions = get_suggestions("budget");
    assert_eq!(suggestions[0].name, "planning");
  }

  #[test]
  fn test_fuzzy_match() {
    let suggestions = get_suggestions("form");
    assert_eq!(suggestions[0].name, "performance");
  }

  #[test]
  fn test_suggestions_ignore_arguments() {
    let suggestions = get_suggestions("preset 7d");
    assert_eq!(suggestions[0].name, "preset");
  }

  #[test]
  fn test_parse_tabs_and_aliases() {
    assert_eq!(parse("clients"), Ok(Action::SwitchTab(Tab::Clients)));
    assert_eq!(parse("timeline"), Ok(Action::SwitchTab(Tab::ClientDetail)));
    assert_eq!(parse("  Q "), Ok(Action::Quit));
    assert_eq!(parse("reload"), Ok(Action::Refresh));
    assert_eq!(parse("logout"), Ok(Action::Logout));
    assert_eq!(parse("ads"), Ok(Action::SwitchTab(Tab::Campaigns)));
    assert_eq!(parse("status"), Ok(Action::SwitchTab(Tab::Health)));
  }

  #[test]
  fn test_parse_preset_and_range() {
    assert_eq!(parse("preset ytd"), Ok(Action::Preset(DatePreset::YearToDate)));
    assert!(parse("preset").is_err());
    assert!(parse("preset yesterday").is_err());

    let from = NaiveDate::from_ymd_opt(2024, 1, 1);
    assert_eq!(parse("range 2024-01-01 -"), Ok(Action::Range(from, None)));
    assert!(parse("range 2024-01-01").is_err());
    assert!(parse("range 2024-13-01 -").is_err());
  }

  #[test]
  fn test_parse_unknown() {
    assert!(parse("").is_err());
    assert!(parse("dance").is_err());
  }
}

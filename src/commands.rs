//! Command parsing for the interactive console

/// Represents a parsed command from user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List every script: list
    List,
    /// Filter the list: search backup nas
    Search(String),
    /// Run a script: run backup.py
    Run(String),
    /// Show one script's details: info backup
    Info(String),
    /// Change a preference: set close_on_run true
    Set(String, String),
    /// Zero a script's run count: reset backup
    Reset(String),
    /// Show the settings file: show settings
    ShowSettings,
    /// Show help: help or ?
    Help,
    /// Clear screen: clear
    Clear,
    /// Exit the console: exit or quit
    Exit,
    /// Empty input (just pressed enter)
    Empty,
    /// Unknown command
    Unknown(String),
}

/// Parse a line of input into a Command
pub fn parse_command(input: &str) -> Command {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Command::Empty;
    }

    let parts: Vec<&str> = trimmed.split_whitespace().collect();

    match parts.as_slice() {
        ["list"] | ["ls"] => Command::List,

        ["search", terms @ ..] | ["/", terms @ ..] => Command::Search(terms.join(" ")),

        // Display names may contain spaces
        ["run", selection @ ..] if !selection.is_empty() => Command::Run(selection.join(" ")),
        ["run"] => Command::Unknown("run requires a script".to_string()),

        ["info", selection @ ..] if !selection.is_empty() => Command::Info(selection.join(" ")),
        ["info"] => Command::Unknown("info requires a script".to_string()),

        ["set", key, value] => Command::Set(key.to_string(), value.to_string()),
        ["set", ..] => Command::Unknown("set requires a preference and a value".to_string()),

        ["reset", selection @ ..] if !selection.is_empty() => {
            Command::Reset(selection.join(" "))
        }
        ["reset"] => Command::Unknown("reset requires a script".to_string()),

        ["show", "settings"] => Command::ShowSettings,
        ["show", ..] => Command::Unknown("show requires 'settings'".to_string()),

        ["help"] | ["?"] => Command::Help,

        ["clear"] => Command::Clear,

        ["exit"] | ["quit"] => Command::Exit,

        _ => Command::Unknown(format!("Unknown command: {}", parts[0])),
    }
}

/// Parse a preference value as typed in the console
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_spaces() {
        assert_eq!(
            parse_command("run  World   Clock"),
            Command::Run("World Clock".to_string())
        );
    }

    #[test]
    fn test_parse_search() {
        match parse_command("search backup nas") {
            Command::Search(q) => assert_eq!(q, "backup nas"),
            _ => panic!("Expected Search command"),
        }
        assert_eq!(parse_command("search"), Command::Search(String::new()));
    }

    #[test]
    fn test_parse_set() {
        match parse_command("set close_on_run true") {
            Command::Set(key, value) => {
                assert_eq!(key, "close_on_run");
                assert_eq!(value, "true");
            }
            _ => panic!("Expected Set command"),
        }
        assert!(matches!(parse_command("set close_on_run"), Command::Unknown(_)));
    }

    #[test]
    fn test_parse_missing_argument() {
        assert!(matches!(parse_command("run"), Command::Unknown(_)));
        assert!(matches!(parse_command("info"), Command::Unknown(_)));
    }

    #[test]
    fn test_parse_empty() {
        match parse_command("   ") {
            Command::Empty => {}
            _ => panic!("Expected Empty command"),
        }
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}

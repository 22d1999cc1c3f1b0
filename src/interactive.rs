//! Interactive console for quickscript

use std::borrow::Cow;

use anyhow::Result;
use colored::Colorize;
use crossterm::{execute, terminal};
use homedir::my_home;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tracing::debug;

use crate::Launcher;
use crate::commands::{Command, parse_command, parse_bool};
use crate::error::LauncherError;
use crate::utils::{ListingTable, print_banner};

/// What the loop should do after a command
enum Flow {
    Continue,
    Close,
}

/// Tab completion helper
struct CommandCompleter {
    commands: Vec<String>,
    scripts: Vec<String>,
}

impl CommandCompleter {
    fn new(scripts: Vec<String>) -> Self {
        Self {
            commands: vec![
                "list".into(),
                "search".into(),
                "run".into(),
                "info".into(),
                "set".into(),
                "reset".into(),
                "show".into(),
                "clear".into(),
                "help".into(),
                "exit".into(),
                "quit".into(),
            ],
            scripts,
        }
    }

    fn pairs<'a>(candidates: impl Iterator<Item = &'a String>) -> Vec<Pair> {
        candidates
            .map(|c| Pair {
                display: c.clone(),
                replacement: c.clone(),
            })
            .collect()
    }
}

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line_to_cursor = &line[..pos];
        let parts: Vec<&str> = line_to_cursor.split_whitespace().collect();
        let after_space = line_to_cursor.ends_with(' ');
        let arg_start = line_to_cursor.find(' ').map(|i| i + 1).unwrap_or(pos);

        let candidates = match parts.as_slice() {
            [] => Self::pairs(self.commands.iter()),

            [partial] if !after_space => {
                return Ok((
                    0,
                    Self::pairs(self.commands.iter().filter(|c| c.starts_with(partial))),
                ));
            }

            ["run" | "info" | "reset"] if after_space => Self::pairs(self.scripts.iter()),
            ["run" | "info" | "reset", partial] if !after_space => {
                Self::pairs(self.scripts.iter().filter(|s| s.starts_with(partial)))
            }

            ["set"] if after_space => vec![Pair {
                display: "close_on_run".into(),
                replacement: "close_on_run ".into(),
            }],

            ["show"] if after_space => vec![Pair {
                display: "settings".into(),
                replacement: "settings".into(),
            }],

            _ => return Ok((pos, vec![])),
        };

        let start = if parts.is_empty() { 0 } else { arg_start };
        Ok((start, candidates))
    }
}

impl Hinter for CommandCompleter {
    type Hint = String;
}

impl Highlighter for CommandCompleter {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Borrowed(hint)
    }
}

impl Validator for CommandCompleter {}

impl Helper for CommandCompleter {}

/// Run the interactive console
pub fn run_interactive(launcher: &mut Launcher) -> Result<()> {
    print_banner(launcher.registry().len());
    report_load_failures(launcher);

    let scripts = launcher.registry().file_names().map(str::to_string).collect();
    let config = rustyline::Config::builder()
        .history_ignore_space(true)
        .completion_type(rustyline::CompletionType::List)
        .build();

    let mut rl: Editor<CommandCompleter, DefaultHistory> = Editor::with_config(config)?;
    rl.set_helper(Some(CommandCompleter::new(scripts)));

    let history_path = my_home()
        .ok()
        .flatten()
        .map(|p| p.join(".quickscript_history"));
    if let Some(ref path) = history_path {
        let _ = rl.load_history(path);
    }

    loop {
        match rl.readline("quickscript > ") {
            Ok(line) => {
                let _ = rl.add_history_entry(&line);

                let flow = match parse_command(&line) {
                    Command::List => cmd_search(launcher, ""),
                    Command::Search(query) => cmd_search(launcher, &query),
                    Command::Run(selection) => cmd_run(launcher, &selection),
                    Command::Info(selection) => cmd_info(launcher, &selection),
                    Command::Set(key, value) => cmd_set(launcher, &key, &value),
                    Command::Reset(selection) => cmd_reset(launcher, &selection),
                    Command::ShowSettings => cmd_show_settings(launcher),
                    Command::Help => cmd_help(),
                    Command::Clear => cmd_clear(),
                    Command::Exit => break,
                    Command::Empty => continue,
                    Command::Unknown(msg) => {
                        println!("[-] {}", msg);
                        Flow::Continue
                    }
                };

                if let Flow::Close = flow {
                    debug!("close_on_run set, leaving console");
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!();
                break;
            }
            Err(e) => {
                println!("Error: {}", e);
                break;
            }
        }
    }

    if let Some(path) = history_path {
        let _ = rl.save_history(&path);
    }

    println!("Goodbye!");
    Ok(())
}

/// Print the scripts discovery had to skip
pub fn report_load_failures(launcher: &Launcher) {
    for failure in launcher.registry().failures() {
        report_error(failure);
    }
}

/// The console's rendering of a launcher error
pub fn report_error(err: &LauncherError) {
    match err {
        LauncherError::NoEntryPoint { file_name } => {
            println!(
                "{} {}\n    No main() method found to run",
                "[-] Error in file:".red(),
                file_name
            );
        }
        LauncherError::ScriptFailed { file_name, message } => {
            println!("{} {} failed:\n{}", "[-]".red(), file_name, message);
        }
        other => println!("{} {}", "[-]".red(), other),
    }
}

// Command handlers

fn cmd_search(launcher: &mut Launcher, query: &str) -> Flow {
    let listings = launcher.listing(query);
    println!();
    println!("{}", ListingTable(listings));
    println!();
    Flow::Continue
}

fn cmd_run(launcher: &mut Launcher, selection: &str) -> Flow {
    match launcher.launch(selection) {
        Ok(outcome) => {
            println!(
                "{} {} (runs: {})",
                "[+] Finished".green(),
                outcome.file_name,
                outcome.run_count
            );
            if outcome.close_window {
                Flow::Close
            } else {
                Flow::Continue
            }
        }
        Err(e) => {
            report_error(&e);
            Flow::Continue
        }
    }
}

fn cmd_info(launcher: &mut Launcher, selection: &str) -> Flow {
    match launcher.info(selection) {
        Ok(listing) => {
            println!();
            print!("{}", listing);
            println!();
        }
        Err(e) => report_error(&e),
    }
    Flow::Continue
}

fn cmd_set(launcher: &mut Launcher, key: &str, value: &str) -> Flow {
    match (key, parse_bool(value)) {
        ("close_on_run", Some(flag)) => {
            launcher.store_mut().set_close_on_run(flag);
            println!("close_on_run => {}", flag);
        }
        ("close_on_run", None) => println!("[-] close_on_run takes true or false"),
        _ => println!("[-] Unknown preference '{}'", key),
    }
    Flow::Continue
}

fn cmd_reset(launcher: &mut Launcher, selection: &str) -> Flow {
    let file_name = match launcher.registry().resolve(selection) {
        Ok(module) => module.file_name.clone(),
        Err(e) => {
            report_error(&e);
            return Flow::Continue;
        }
    };
    launcher.store_mut().reset_run_count(&file_name);
    println!("[*] Reset run count for {}", file_name);
    Flow::Continue
}

fn cmd_show_settings(launcher: &Launcher) -> Flow {
    let store = launcher.store();
    match store.load() {
        Ok(record) => {
            println!();
            println!("Settings: {}", store.path().display());
            println!("{}", "=".repeat(60));
            println!("  close_on_run: {}", record.close_on_run);
            println!("  tracked scripts: {}", record.run_count.len());
            println!();
        }
        Err(e) => report_error(&e),
    }
    Flow::Continue
}

fn cmd_help() -> Flow {
    println!(
        r#"
Commands:
  list                      List all scripts, most used first
  search <terms...>         Show scripts matching any term
  run <script>              Run a script by file name or display name
  info <script>             Show details about a script
  set close_on_run <bool>   Exit the console after a successful run
  reset <script>            Zero a script's run count
  show settings             Show the settings file
  clear                     Clear the screen
  help                      Show this help message
  exit                      Exit the console

Examples:
  search backup nas
  run World Clock
  set close_on_run true
"#
    );
    Flow::Continue
}

fn cmd_clear() -> Flow {
    let _ = execute!(std::io::stdout(), terminal::Clear(terminal::ClearType::All));
    let _ = execute!(std::io::stdout(), crossterm::cursor::MoveTo(0, 0));
    Flow::Continue
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete(line: &str) -> (usize, Vec<String>) {
        let completer = CommandCompleter::new(vec!["backup.py".into(), "clock.py".into()]);
        let history = DefaultHistory::new();
        let ctx = Context::new(&history);
        let (start, pairs) = completer.complete(line, line.len(), &ctx).unwrap();
        (start, pairs.into_iter().map(|p| p.replacement).collect())
    }

    #[test]
    fn test_complete_command_prefix() {
        let (start, found) = complete("se");
        assert_eq!(start, 0);
        assert_eq!(found, vec!["search", "set"]);
    }

    #[test]
    fn test_complete_script_names() {
        let (start, found) = complete("run ");
        assert_eq!(start, 4);
        assert_eq!(found, vec!["backup.py", "clock.py"]);

        let (start, found) = complete("info cl");
        assert_eq!(start, 5);
        assert_eq!(found, vec!["clock.py"]);
    }
}

use std::fmt;

use colored::Colorize;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, Color, ColumnConstraint, Table, Width as ColumnWidth};
use terminal_size::{Height, Width, terminal_size};

use super::metadata::Listing;

/// Print the launcher banner
pub fn print_banner(scripts: usize) {
    let raw_banner = r#"
  ___        _      _     ___         _      _
 / _ \ _  _ (_) __ | |__ / __| __ _ _(_)_ __| |_
| (_) | || || |/ _|| / / \__ \/ _| '_| | '_ \  _|
 \__\_\\_,_||_|\__||_\_\ |___/\__|_| |_| .__/\__|
                                       |_|
"#;
    println!("{}", raw_banner.blue());
    println!(
        "{} script(s) loaded - type {} for commands\n",
        scripts.to_string().bold().yellow(),
        "help".bold().white()
    );
}

/// A set of listings rendered as a table sized to the terminal
pub struct ListingTable(pub Vec<Listing>);

impl fmt::Display for ListingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "No scripts found");
        }

        let mut width = 80;
        if let Some((Width(terminal_width), Height(_))) = terminal_size() {
            width = terminal_width;
        }

        let headers: Vec<Cell> = ["NAME", "FILE", "RUNS", "TAGS", "DESCRIPTION"]
            .into_iter()
            .map(|h| Cell::new(h).set_alignment(CellAlignment::Center).fg(Color::Green))
            .collect();
        let columns = headers.len() as u16;

        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.apply_modifier(UTF8_ROUND_CORNERS);
        table.set_header(headers);

        for idx in 0..columns as usize {
            if let Some(column) = table.column_mut(idx) {
                column.set_constraint(ColumnConstraint::UpperBoundary(ColumnWidth::Fixed(
                    width / columns,
                )));
            }
        }
        table.set_width(width);

        for listing in &self.0 {
            let name_color = if listing.runnable { Color::Cyan } else { Color::DarkGrey };
            table.add_row(vec![
                Cell::new(&listing.display_name).fg(name_color),
                Cell::new(&listing.file_name),
                Cell::new(listing.run_count).set_alignment(CellAlignment::Right),
                Cell::new(listing.tags.join(", ")).fg(Color::Blue),
                Cell::new(&listing.description),
            ]);
        }

        write!(f, "{}", table)
    }
}

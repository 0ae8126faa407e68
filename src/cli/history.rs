use super::ui;
use crate::core::history::{ConversionRecord, HistoryStore};
use anyhow::Result;
use chrono::Local;
use comfy_table::{Cell, Table};
use console::Term;

pub fn history_table(records: &[ConversionRecord]) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("When"),
        ui::header_cell("From"),
        ui::header_cell("To"),
        ui::header_cell("Rate"),
        ui::header_cell("Rate Date"),
    ]);

    for record in records {
        table.add_row(vec![
            Cell::new(
                record
                    .timestamp
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M:%S"),
            ),
            Cell::new(ui::format_amount(record.from_amount, &record.from_currency)),
            Cell::new(ui::format_amount(record.to_amount, &record.to_currency)),
            ui::number_cell(record.rate, 4),
            Cell::new(record.date),
        ]);
    }
    table
}

pub fn show(history: &HistoryStore) {
    let records = history.records();
    if records.is_empty() {
        println!(
            "{}",
            ui::style_text("No conversions yet.", ui::StyleType::Subtle)
        );
        return;
    }

    println!(
        "{}\n",
        ui::style_text("Conversion History", ui::StyleType::Title)
    );
    println!("{}", history_table(&records));
}

fn confirm_clear() -> Result<bool> {
    let term = Term::stdout();
    term.write_str("Are you sure you want to clear all conversion history? [y/N] ")?;
    let answer = term.read_line()?;
    Ok(is_confirmation(&answer))
}

pub(crate) fn is_confirmation(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

pub fn clear(history: &HistoryStore, assume_yes: bool) -> Result<()> {
    if !assume_yes && !confirm_clear()? {
        println!("Cancelled.");
        return Ok(());
    }
    history.clear()?;
    println!("Conversion history cleared.");
    Ok(())
}

pub fn run(history: &HistoryStore, clear_history: bool, assume_yes: bool) -> Result<()> {
    if clear_history {
        clear(history, assume_yes)
    } else {
        show(history);
        Ok(())
    }
}

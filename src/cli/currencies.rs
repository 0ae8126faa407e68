use super::ui;
use crate::core::currency::{Currency, RateSource, filter_currencies, sorted_currencies};
use anyhow::Result;
use comfy_table::{Cell, CellAlignment, Table};

fn currency_table(currencies: &[&Currency]) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Code"),
        ui::header_cell("Name"),
        ui::header_cell("Symbol"),
        ui::header_cell("Decimals"),
    ]);

    for currency in currencies {
        table.add_row(vec![
            Cell::new(&currency.code),
            Cell::new(&currency.name),
            Cell::new(currency.symbol_native.as_deref().unwrap_or(&currency.symbol)),
            Cell::new(currency.decimal_digits).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

pub async fn run(rates: &dyn RateSource, query: Option<&str>) -> Result<()> {
    let pb = ui::new_spinner("Fetching currencies...");
    let result = rates.list_currencies().await;
    pb.finish_and_clear();

    let all = sorted_currencies(&result?);
    let matches = filter_currencies(&all, query.unwrap_or_default());

    if matches.is_empty() {
        println!(
            "{}",
            ui::style_text("No currencies match the search.", ui::StyleType::Subtle)
        );
        return Ok(());
    }

    println!("{}", currency_table(&matches));
    println!(
        "\n{} of {} currencies",
        ui::style_text(&matches.len().to_string(), ui::StyleType::Label),
        all.len()
    );
    Ok(())
}

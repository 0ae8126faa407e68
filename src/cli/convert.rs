use super::ui;
use crate::core::currency::{Currency, RateSource, display_currency, sorted_currencies};
use crate::core::form::{Conversion, ConversionForm};
use anyhow::Result;
use chrono::NaiveDate;
use tracing::warn;

/// Values given on the command line; `None` keeps the form default.
#[derive(Debug, Clone, Default)]
pub struct ConvertArgs {
    pub amount: Option<f64>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub date: Option<NaiveDate>,
    pub swap: bool,
}

pub(crate) fn format_conversion(
    form: &ConversionForm,
    conversion: &Conversion,
    currencies: &[Currency],
) -> String {
    let from = form.from_currency();
    let to = form.to_currency();
    let when = form
        .date()
        .map_or_else(|| "latest".to_string(), |d| d.to_string());

    format!(
        "{} → {}\n{} = {}\n{}",
        ui::style_text(&display_currency(currencies, from), ui::StyleType::Label),
        ui::style_text(&display_currency(currencies, to), ui::StyleType::Label),
        ui::format_amount(form.amount(), from),
        ui::style_text(
            &ui::format_amount(conversion.converted_amount, to),
            ui::StyleType::Result
        ),
        ui::style_text(
            &format!("1 {from} = {:.4} {to} ({when})", conversion.exchange_rate),
            ui::StyleType::Subtle
        ),
    )
}

pub(crate) fn print_outcome(
    form: &ConversionForm,
    outcome: &Result<Conversion>,
    currencies: &[Currency],
) {
    match outcome {
        Ok(conversion) => {
            println!("{}", format_conversion(form, conversion, currencies));
            if conversion.record.is_none() {
                println!(
                    "{}",
                    ui::style_text("Conversion was not saved to history", ui::StyleType::Error)
                );
            }
        }
        Err(e) => println!(
            "{}",
            ui::style_text(&format!("Conversion failed: {e}"), ui::StyleType::Error)
        ),
    }
}

/// Currency names are only used for display, so a failed lookup is logged
/// and the bare codes are shown instead.
pub(crate) async fn load_currency_names(rates: &dyn RateSource) -> Vec<Currency> {
    match rates.list_currencies().await {
        Ok(currencies) => sorted_currencies(&currencies),
        Err(e) => {
            warn!(error = ?e, "Failed to load currencies");
            Vec::new()
        }
    }
}

pub async fn run(form: &mut ConversionForm, rates: &dyn RateSource, args: ConvertArgs) -> Result<()> {
    if let Some(amount) = args.amount {
        form.set_amount(amount);
    }
    if let Some(from) = &args.from {
        form.select_from(from);
    }
    if let Some(to) = &args.to {
        form.select_to(to);
    }
    form.set_date(args.date);

    let busy = ui::spawn_busy_indicator(rates.loading(), "Converting...");

    // The busy flag stays raised until both requests are done
    let (currencies, outcome) = futures::join!(load_currency_names(rates), form.convert());
    print_outcome(form, &outcome, &currencies);

    if args.swap {
        if let Some(outcome) = form.swap().await {
            println!();
            print_outcome(form, &outcome, &currencies);
        }
    }

    busy.abort();
    Ok(())
}

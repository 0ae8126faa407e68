use super::{convert, history, ui};
use crate::core::amount;
use crate::core::currency::RateSource;
use crate::core::form::ConversionForm;
use crate::core::history::HistoryStore;
use anyhow::{Result, anyhow, bail};
use chrono::NaiveDate;
use std::str::FromStr;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

const HELP: &str = "\
Commands:
  from <CODE>          set the source currency
  to <CODE>            set the target currency
  amount <AMOUNT>      set the amount (at most two decimals)
  date <YYYY-MM-DD>    use the rate of a past date
  date                 use the latest rate
  swap                 swap currencies (re-converts if a result is shown)
  convert              run the conversion
  history              show past conversions
  clear                clear the history
  help                 show this help
  quit                 leave";

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    From(String),
    To(String),
    Amount(String),
    Date(Option<NaiveDate>),
    Swap,
    Convert,
    History,
    Clear,
    Help,
    Quit,
}

impl FromStr for Action {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let command = parts
            .next()
            .ok_or_else(|| anyhow!("Empty command"))?
            .to_lowercase();
        let arg = parts.next();

        let action = match (command.as_str(), arg) {
            ("from", Some(code)) => Action::From(code.to_string()),
            ("to", Some(code)) => Action::To(code.to_string()),
            ("amount", Some(value)) => Action::Amount(value.to_string()),
            ("date", Some(value)) => Action::Date(Some(
                NaiveDate::parse_from_str(value, "%Y-%m-%d")
                    .map_err(|_| anyhow!("Invalid date '{value}', expected YYYY-MM-DD"))?,
            )),
            ("date", None) => Action::Date(None),
            ("swap", None) => Action::Swap,
            ("convert" | "c", None) => Action::Convert,
            ("history", None) => Action::History,
            ("clear", None) => Action::Clear,
            ("help" | "?", None) => Action::Help,
            ("quit" | "exit" | "q", None) => Action::Quit,
            ("from" | "to" | "amount", None) => bail!("'{command}' needs a value"),
            _ => bail!("Unknown command '{}'", s.trim()),
        };

        if parts.next().is_some() {
            bail!("Too many arguments for '{command}'");
        }
        Ok(action)
    }
}

/// Applies the keystroke mask to a typed amount. Returns the accepted text
/// alongside the parsed value.
fn masked_amount(input: &str) -> Result<(String, f64)> {
    let accepted = amount::type_text(input);
    let value = amount::parse_amount(&accepted)?;
    Ok((accepted, value))
}

fn print_form(form: &ConversionForm) {
    let date = form
        .date()
        .map_or_else(|| "latest".to_string(), |d| d.to_string());
    println!(
        "{}",
        ui::style_text(
            &format!(
                "{} {} → {} ({date})",
                form.amount(),
                form.from_currency(),
                form.to_currency()
            ),
            ui::StyleType::Subtle
        )
    );
}

fn spawn_history_watcher(history: &HistoryStore) -> JoinHandle<()> {
    let mut records = history.subscribe();
    tokio::spawn(async move {
        while records.changed().await.is_ok() {
            let count = records.borrow_and_update().len();
            println!(
                "{}",
                ui::style_text(&format!("History: {count} conversion(s)"), ui::StyleType::Subtle)
            );
        }
    })
}

pub async fn run(
    form: &mut ConversionForm,
    rates: &dyn RateSource,
    history_store: &HistoryStore,
) -> Result<()> {
    println!("{HELP}\n");
    print_form(form);

    let currencies = convert::load_currency_names(rates).await;
    let busy = ui::spawn_busy_indicator(rates.loading(), "Converting...");
    let watcher = spawn_history_watcher(history_store);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let action = match line.parse::<Action>() {
            Ok(action) => action,
            Err(e) => {
                println!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error));
                continue;
            }
        };

        match action {
            Action::From(code) => form.select_from(&code),
            Action::To(code) => form.select_to(&code),
            Action::Amount(input) => match masked_amount(&input) {
                Ok((accepted, value)) => {
                    if accepted != input {
                        println!(
                            "{}",
                            ui::style_text(
                                &format!("Amount entered as {accepted}"),
                                ui::StyleType::Subtle
                            )
                        );
                    }
                    form.set_amount(value);
                }
                Err(e) => println!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error)),
            },
            Action::Date(date) => form.set_date(date),
            Action::Swap => {
                if let Some(outcome) = form.swap().await {
                    convert::print_outcome(form, &outcome, &currencies);
                    continue;
                }
            }
            Action::Convert => {
                let outcome = form.convert().await;
                convert::print_outcome(form, &outcome, &currencies);
                continue;
            }
            Action::History => {
                history::show(history_store);
                continue;
            }
            Action::Clear => {
                println!("Are you sure you want to clear all conversion history? [y/N]");
                let answer = lines.next_line().await?.unwrap_or_default();
                if history::is_confirmation(&answer) {
                    if let Err(e) = history_store.clear() {
                        println!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error));
                    }
                } else {
                    println!("Cancelled.");
                }
                continue;
            }
            Action::Help => {
                println!("{HELP}");
                continue;
            }
            Action::Quit => break,
        }
        print_form(form);
    }

    watcher.abort();
    busy.abort();
    Ok(())
}

use super::ui;
use crate::catalog::Catalog;
use crate::core::config::AppConfig;
use crate::core::money::parse_amount;
use anyhow::Result;
use clap::Subcommand;
use comfy_table::{Cell, CellAlignment};
use rust_decimal::Decimal;
use std::path::Path;

#[derive(Debug, Subcommand)]
pub enum CurrencyCommand {
    /// List all currencies and their rates against the base currency
    List,
    /// Register a new currency
    Add { code: String, rate: Decimal },
    /// Set the rate of a currency, registering it if needed
    Set { code: String, rate: Decimal },
    /// Convert a base currency amount for display
    Convert { amount: String, code: String },
}

pub fn run(
    command: CurrencyCommand,
    catalog: &Catalog,
    config: &AppConfig,
    config_path: &Path,
) -> Result<()> {
    match command {
        CurrencyCommand::List => display_rates(catalog),
        CurrencyCommand::Add { code, rate } => {
            catalog.add_currency(&code, rate)?;
            persist_rates(catalog, config, config_path)?;
            println!("Currency {code} added at {rate}");
        }
        CurrencyCommand::Set { code, rate } => {
            catalog.set_rate(&code, rate)?;
            persist_rates(catalog, config, config_path)?;
            println!("Rate of {code} set to {rate}");
        }
        CurrencyCommand::Convert { amount, code } => {
            let conversion = catalog.convert(parse_amount(&amount)?, &code)?;
            println!(
                "{} {} = {} {}",
                conversion.original_amount,
                ui::style_text(&conversion.base_currency, ui::StyleType::Label),
                ui::style_text(
                    &format!("{:.2}", conversion.converted_amount),
                    ui::StyleType::Value
                ),
                ui::style_text(&conversion.currency_code, ui::StyleType::Label),
            );
        }
    }
    Ok(())
}

/// Writes the registry back to the config file so rate changes survive
/// restarts.
fn persist_rates(catalog: &Catalog, config: &AppConfig, config_path: &Path) -> Result<()> {
    let mut updated = config.clone();
    updated.rates = catalog
        .list_currencies()
        .into_iter()
        .filter(|(code, _)| code != catalog.base_currency())
        .collect();
    updated.save_to_path(config_path)
}

fn display_rates(catalog: &Catalog) {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Currency"), ui::header_cell("Rate")]);
    for (code, rate) in catalog.list_currencies() {
        let label = if code == catalog.base_currency() {
            format!("{code} (base)")
        } else {
            code
        };
        table.add_row(vec![
            Cell::new(label),
            Cell::new(rate).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{table}");
}

use super::ui;
use crate::catalog::Catalog;
use crate::core::model::{NewProduct, ProductId, ReferenceId};
use crate::core::money::parse_amount;
use anyhow::Result;
use clap::Subcommand;
use comfy_table::Cell;

#[derive(Debug, Subcommand)]
pub enum ProductCommand {
    /// Add a product priced in the base currency
    Add {
        #[arg(long)]
        model: ReferenceId,
        #[arg(long)]
        color: ReferenceId,
        #[arg(long)]
        package: ReferenceId,
        #[arg(long)]
        price: String,
        #[arg(long, default_value_t = 0)]
        stock: u32,
    },
    /// List active products
    List {
        /// Display prices in this currency
        #[arg(long)]
        currency: Option<String>,
    },
    /// Show one product with its price in a display currency
    Show {
        id: ProductId,
        #[arg(long)]
        currency: Option<String>,
    },
    /// Change the price of a product
    Price {
        id: ProductId,
        amount: String,
        /// Currency of the given amount, defaults to the base currency
        #[arg(long)]
        currency: Option<String>,
        /// Who is making the change
        #[arg(long)]
        by: Option<String>,
    },
    /// Show the price history of a product, newest first
    History { id: ProductId },
    /// Set the stock of a product
    Stock {
        id: ProductId,
        #[arg(allow_negative_numbers = true)]
        stock: i64,
    },
    /// Remove a product and its comments
    Remove { id: ProductId },
    /// Total stock per car model
    Inventory,
}

pub async fn run(command: ProductCommand, catalog: &Catalog) -> Result<()> {
    match command {
        ProductCommand::Add {
            model,
            color,
            package,
            price,
            stock,
        } => {
            let product = catalog
                .add_product(NewProduct {
                    model_id: model,
                    color_id: color,
                    package_type_id: package,
                    price: parse_amount(&price)?,
                    stock,
                })
                .await?;
            println!("Added product {}", product.id);
        }
        ProductCommand::List { currency } => {
            let code = currency.unwrap_or_else(|| catalog.base_currency().to_string());
            let mut table = ui::new_styled_table();
            table.set_header(vec![
                ui::header_cell("ID"),
                ui::header_cell("Model"),
                ui::header_cell("Color"),
                ui::header_cell("Package"),
                ui::header_cell("Stock"),
                ui::header_cell(&format!("Price ({code})")),
            ]);
            for product in catalog.list_products().await? {
                let quote = catalog.get_converted_price(product.id, &code).await?;
                table.add_row(vec![
                    Cell::new(product.id),
                    Cell::new(product.model_id),
                    Cell::new(product.color_id),
                    Cell::new(product.package_type_id),
                    Cell::new(product.stock),
                    ui::money_cell(quote.converted_price),
                ]);
            }
            println!("{table}");
        }
        ProductCommand::Show { id, currency } => {
            let code = currency.unwrap_or_else(|| catalog.base_currency().to_string());
            let quote = catalog.get_converted_price(id, &code).await?;
            let product = &quote.product;
            println!(
                "{}\n",
                ui::style_text(&format!("Product {}", product.id), ui::StyleType::Title)
            );
            println!("Model:    {}", product.model_id);
            println!("Color:    {}", product.color_id);
            println!("Package:  {}", product.package_type_id);
            println!("Stock:    {}", product.stock);
            println!(
                "Price:    {:.2} {} {}",
                product.price,
                catalog.base_currency(),
                ui::style_text(
                    &format!("({:.2} {})", quote.converted_price, quote.currency_code),
                    ui::StyleType::Subtle
                )
            );
        }
        ProductCommand::Price {
            id,
            amount,
            currency,
            by,
        } => {
            let code = currency.unwrap_or_else(|| catalog.base_currency().to_string());
            let product = catalog
                .update_price(id, parse_amount(&amount)?, &code, by.as_deref())
                .await?;
            println!(
                "Price of product {} is now {}",
                product.id,
                ui::style_text(
                    &format!("{:.2} {}", product.price, catalog.base_currency()),
                    ui::StyleType::Value
                )
            );
        }
        ProductCommand::History { id } => {
            let mut table = ui::new_styled_table();
            table.set_header(vec![
                ui::header_cell("#"),
                ui::header_cell("Changed at"),
                ui::header_cell("Change"),
                ui::header_cell("Currency"),
                ui::header_cell("By"),
            ]);
            for entry in catalog.price_history(id).await? {
                table.add_row(vec![
                    Cell::new(entry.id),
                    Cell::new(entry.changed_at.format("%Y-%m-%d %H:%M:%S")),
                    ui::price_change_cell(entry.old_price, entry.new_price),
                    Cell::new(&entry.currency),
                    ui::format_optional_cell(entry.changed_by, |by| by),
                ]);
            }
            println!("{table}");
        }
        ProductCommand::Stock { id, stock } => {
            let product = catalog.update_stock(id, stock).await?;
            println!("Stock of product {} is now {}", product.id, product.stock);
        }
        ProductCommand::Remove { id } => {
            let comments = catalog.remove_product(id).await?;
            println!("Removed product {id} and {comments} comment(s)");
        }
        ProductCommand::Inventory => {
            let mut table = ui::new_styled_table();
            table.set_header(vec![ui::header_cell("Model"), ui::header_cell("Stock")]);
            for (model, stock) in catalog.inventory_by_model().await? {
                table.add_row(vec![Cell::new(model), Cell::new(stock)]);
            }
            println!("{table}");
        }
    }
    Ok(())
}

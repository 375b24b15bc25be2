use super::ui;
use crate::catalog::Catalog;
use crate::core::model::{CustomerId, NewCustomer, ProductId};
use anyhow::Result;
use clap::Subcommand;
use comfy_table::Cell;

#[derive(Debug, Subcommand)]
pub enum CustomerCommand {
    /// Register a customer
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        surname: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },
    /// Show a customer
    Show { id: CustomerId },
}

#[derive(Debug, Subcommand)]
pub enum CommentCommand {
    /// Leave a rated comment on a product
    Add {
        product: ProductId,
        customer: CustomerId,
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        rating: u8,
        #[arg(long)]
        body: String,
    },
    /// List the comments of a product
    List { product: ProductId },
}

pub async fn run_customer(command: CustomerCommand, catalog: &Catalog) -> Result<()> {
    match command {
        CustomerCommand::Add {
            name,
            surname,
            email,
            phone,
            address,
        } => {
            let customer = catalog
                .register_customer(NewCustomer {
                    name,
                    surname,
                    email,
                    phone_number: phone,
                    address,
                })
                .await?;
            println!("Registered customer {}", customer.id);
        }
        CustomerCommand::Show { id } => {
            let customer = catalog.get_customer(id).await?;
            println!(
                "{}\n",
                ui::style_text(
                    &format!("{} {}", customer.name, customer.surname),
                    ui::StyleType::Title
                )
            );
            println!("Email:    {}", customer.email);
            println!(
                "Phone:    {}",
                customer.phone_number.as_deref().unwrap_or("N/A")
            );
            println!("Address:  {}", customer.address.as_deref().unwrap_or("N/A"));
            println!(
                "Since:    {}",
                ui::style_text(
                    &customer.created_at.format("%Y-%m-%d").to_string(),
                    ui::StyleType::Subtle
                )
            );
        }
    }
    Ok(())
}

pub async fn run_comment(command: CommentCommand, catalog: &Catalog) -> Result<()> {
    match command {
        CommentCommand::Add {
            product,
            customer,
            rating,
            body,
        } => {
            let comment = catalog.add_comment(product, customer, rating, &body).await?;
            println!("Added comment {} on product {}", comment.id, product);
        }
        CommentCommand::List { product } => {
            let mut table = ui::new_styled_table();
            table.set_header(vec![
                ui::header_cell("#"),
                ui::header_cell("Customer"),
                ui::header_cell("Rating"),
                ui::header_cell("Comment"),
            ]);
            for comment in catalog.comments_for(product).await? {
                table.add_row(vec![
                    Cell::new(comment.id),
                    Cell::new(comment.customer_id),
                    Cell::new("★".repeat(usize::from(comment.rating))),
                    Cell::new(&comment.body),
                ]);
            }
            println!("{table}");
        }
    }
    Ok(())
}

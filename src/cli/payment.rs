use super::ui;
use crate::catalog::Catalog;
use crate::core::model::{CustomerId, NewPaymentMethod, PaymentMethodId, PaymentMethodPatch};
use anyhow::Result;
use clap::{Args, Subcommand};

#[derive(Debug, Default, Args)]
pub struct PaymentDetails {
    #[arg(long)]
    bank: Option<String>,
    #[arg(long)]
    account: Option<String>,
    #[arg(long)]
    card: Option<String>,
    #[arg(long)]
    holder: Option<String>,
    /// Card expiry, e.g. 12/29
    #[arg(long)]
    expiry: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum PaymentCommand {
    /// Add a payment method to a customer
    Add {
        customer: CustomerId,
        #[command(flatten)]
        details: PaymentDetails,
        /// Make it the customer's default method
        #[arg(long)]
        default: bool,
    },
    /// Update the details of a payment method
    Update {
        id: PaymentMethodId,
        #[command(flatten)]
        details: PaymentDetails,
        /// Promote it to the customer's default method
        #[arg(long)]
        default: bool,
    },
    /// Delete a payment method
    Delete { id: PaymentMethodId },
    /// Show a payment method
    Show { id: PaymentMethodId },
    /// List the payment methods of a customer, default first
    List { customer: CustomerId },
    /// Show the default payment method of a customer
    Default { customer: CustomerId },
}

pub async fn run(command: PaymentCommand, catalog: &Catalog) -> Result<()> {
    match command {
        PaymentCommand::Add {
            customer,
            details,
            default,
        } => {
            let method = catalog
                .add_payment_method(
                    customer,
                    NewPaymentMethod {
                        bank_name: details.bank,
                        account_number: details.account,
                        card_number: details.card,
                        card_holder_name: details.holder,
                        expiry_date: details.expiry,
                        is_default: default,
                    },
                )
                .await?;
            println!("Added payment method {}", method.id);
            println!("{}", ui::payment_methods_table(&[method]));
        }
        PaymentCommand::Update {
            id,
            details,
            default,
        } => {
            let method = catalog
                .update_payment_method(
                    id,
                    PaymentMethodPatch {
                        bank_name: details.bank,
                        account_number: details.account,
                        card_number: details.card,
                        card_holder_name: details.holder,
                        expiry_date: details.expiry,
                        is_default: default.then_some(true),
                    },
                )
                .await?;
            println!("{}", ui::payment_methods_table(&[method]));
        }
        PaymentCommand::Delete { id } => {
            catalog.delete_payment_method(id).await?;
            println!("Deleted payment method {id}");
        }
        PaymentCommand::Show { id } => {
            let method = catalog.get_payment_method(id).await?;
            println!("{}", ui::payment_methods_table(&[method]));
        }
        PaymentCommand::List { customer } => {
            let methods = catalog.list_payment_methods(customer).await?;
            println!("{}", ui::payment_methods_table(&methods));
        }
        PaymentCommand::Default { customer } => {
            match catalog.get_default_payment_method(customer).await? {
                Some(method) => println!("{}", ui::payment_methods_table(&[method])),
                None => println!(
                    "{}",
                    ui::style_text(
                        &format!("Customer {customer} has no payment methods"),
                        ui::StyleType::Subtle
                    )
                ),
            }
        }
    }
    Ok(())
}

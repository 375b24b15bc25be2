pub mod currency;
pub mod customer;
pub mod payment;
pub mod product;
pub mod setup;
pub mod ui;

use clap::Subcommand;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage currencies and exchange rates
    #[command(subcommand)]
    Currency(currency::CurrencyCommand),
    /// Manage products, prices and stock
    #[command(subcommand)]
    Product(product::ProductCommand),
    /// Manage customers
    #[command(subcommand)]
    Customer(customer::CustomerCommand),
    /// Manage product comments
    #[command(subcommand)]
    Comment(customer::CommentCommand),
    /// Manage customer payment methods
    #[command(subcommand)]
    Payment(payment::PaymentCommand),
}

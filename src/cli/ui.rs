use crate::core::model::PaymentMethod;
use crate::core::money::Money;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    Label,
    Value,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::Label => style(text).bold(),
        StyleType::Value => style(text).green().bold(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Formats an `Option<T>` into a `Cell`. `None` is displayed as "N/A".
pub fn format_optional_cell<T>(value: Option<T>, format_fn: impl Fn(T) -> String) -> Cell {
    value.map_or(Cell::new("N/A").fg(Color::DarkGrey), |v| Cell::new(format_fn(v)))
}

/// Right aligned amount with two decimals.
pub fn money_cell(amount: Money) -> Cell {
    Cell::new(format!("{amount:.2}")).set_alignment(CellAlignment::Right)
}

/// Colors a price transition by direction.
pub fn price_change_cell(old: Money, new: Money) -> Cell {
    let cell = Cell::new(format!("{old:.2} → {new:.2}")).set_alignment(CellAlignment::Right);
    match new.cmp(&old) {
        std::cmp::Ordering::Greater => cell.fg(Color::Red),
        std::cmp::Ordering::Less => cell.fg(Color::Green),
        std::cmp::Ordering::Equal => cell,
    }
}

pub fn default_cell(is_default: bool) -> Cell {
    if is_default {
        Cell::new("★ default")
            .fg(Color::Green)
            .add_attribute(Attribute::Bold)
    } else {
        Cell::new("")
    }
}

pub fn payment_methods_table(methods: &[PaymentMethod]) -> Table {
    let mut table = new_styled_table();
    table.set_header(vec![
        header_cell("ID"),
        header_cell("Bank"),
        header_cell("Account"),
        header_cell("Card"),
        header_cell("Holder"),
        header_cell("Expiry"),
        header_cell(""),
    ]);
    for method in methods {
        table.add_row(vec![
            Cell::new(method.id),
            format_optional_cell(method.bank_name.as_deref(), str::to_string),
            format_optional_cell(method.account_number.as_deref(), str::to_string),
            format_optional_cell(method.card_number.as_deref(), str::to_string),
            format_optional_cell(method.card_holder_name.as_deref(), str::to_string),
            format_optional_cell(method.expiry_date.as_deref(), str::to_string),
            default_cell(method.is_default),
        ]);
    }
    table
}

//! # Receipt Printing
//!
//! Fixed-width receipt rendering and the printer seam.
//!
//! ```text
//!          My Shop
//!        12 Market Rd
//! --------------------------------
//! Bill #4          14-06-2024 09:10
//! --------------------------------
//! Cola            2 x 25.00  50.00
//! Meetha Paan     1 x 15.00  15.00
//! --------------------------------
//! TOTAL                 Rs. 65.00
//!    Thank you! Visit again
//! ```
//!
//! Printing happens after the bill is committed. A failed print is logged
//! and never undoes the sale.

use std::sync::Arc;

use tracing::{info, warn};

use rebill_core::settings::keys;
use rebill_core::{Bill, Settings};

/// Shop details printed on every receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopInfo {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub currency_symbol: String,
    pub footer: String,
}

impl ShopInfo {
    pub fn from_settings(settings: &Settings) -> Self {
        ShopInfo {
            name: settings.text(keys::SHOP_NAME),
            address: settings.text(keys::SHOP_ADDRESS),
            phone: settings.text(keys::SHOP_PHONE),
            currency_symbol: settings.text(keys::CURRENCY_SYMBOL),
            footer: settings.text(keys::RECEIPT_FOOTER),
        }
    }
}

/// A rendered receipt, one string per printed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub bill_no: i64,
    pub lines: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum PrintError {
    #[error("Printer unavailable: {0}")]
    Unavailable(String),

    #[error("Print failed: {0}")]
    Failed(String),
}

/// Output device for receipts.
pub trait ReceiptPrinter: Send + Sync {
    fn print(&self, receipt: &Receipt) -> Result<(), PrintError>;
}

/// Writes receipts to the log. Used when no device driver is wired in.
#[derive(Debug, Default)]
pub struct LogPrinter;

impl ReceiptPrinter for LogPrinter {
    fn print(&self, receipt: &Receipt) -> Result<(), PrintError> {
        info!(bill_no = receipt.bill_no, "Printing receipt\n{}", receipt.lines.join("\n"));
        Ok(())
    }
}

/// Renders `bill` for paper `width` characters wide.
pub fn render_receipt(bill: &Bill, shop: &ShopInfo, width: usize) -> Receipt {
    let rule = "-".repeat(width);
    let mut lines = Vec::new();

    for text in [&shop.name, &shop.address, &shop.phone] {
        if !text.trim().is_empty() {
            lines.push(center(text.trim(), width));
        }
    }
    lines.push(rule.clone());
    lines.push(spread(
        &format!("Bill #{}", bill.bill_no),
        &bill.created_at.format("%d-%m-%Y %H:%M").to_string(),
        width,
    ));
    if let Some(customer) = &bill.customer_name {
        lines.push(truncate(&format!("Customer: {}", customer), width));
    }
    lines.push(rule.clone());

    for item in &bill.items {
        let amounts = format!(
            "{} x {:.2} {:>7.2}",
            item.quantity,
            item.price,
            item.line_total()
        );
        let name_width = width.saturating_sub(amounts.chars().count() + 1);
        let name = truncate(&item.name, name_width);
        lines.push(spread(&name, &amounts, width));
    }

    lines.push(rule);
    lines.push(spread(
        "TOTAL",
        &format!("{} {:.2}", shop.currency_symbol.trim(), bill.total_amount),
        width,
    ));
    lines.push(spread("Paid by", bill.payment_method.as_str(), width));
    if !shop.footer.trim().is_empty() {
        lines.push(center(shop.footer.trim(), width));
    }

    Receipt {
        bill_no: bill.bill_no,
        lines,
    }
}

/// Prints on the blocking pool and waits for the device.
pub async fn print_now(printer: Arc<dyn ReceiptPrinter>, receipt: Receipt) -> Result<(), PrintError> {
    tokio::task::spawn_blocking(move || printer.print(&receipt))
        .await
        .map_err(|e| PrintError::Failed(format!("printing task aborted: {}", e)))?
}

/// Prints in the background. Failures are logged only.
pub fn spawn_print(printer: Arc<dyn ReceiptPrinter>, receipt: Receipt) {
    tokio::spawn(async move {
        let bill_no = receipt.bill_no;
        if let Err(e) = print_now(printer, receipt).await {
            warn!(bill_no, error = %e, "Receipt printing failed");
        }
    });
}

fn truncate(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

fn center(text: &str, width: usize) -> String {
    let text = truncate(text, width);
    let pad = (width - text.chars().count()) / 2;
    format!("{}{}", " ".repeat(pad), text)
}

/// `left` and `right` on one line, right-aligned to `width`.
fn spread(left: &str, right: &str, width: usize) -> String {
    let right = truncate(right, width);
    let room = width - right.chars().count();
    let left = truncate(left, room.saturating_sub(1));
    let gap = room - left.chars().count();
    format!("{}{}{}", left, " ".repeat(gap), right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rebill_core::{BillItem, BillStatus, PaymentMethod};

    fn shop() -> ShopInfo {
        ShopInfo {
            name: "My Shop".to_string(),
            address: "12 Market Rd".to_string(),
            phone: String::new(),
            currency_symbol: "Rs.".to_string(),
            footer: "Thank you! Visit again".to_string(),
        }
    }

    fn bill() -> Bill {
        let at = NaiveDate::from_ymd_opt(2024, 6, 14)
            .unwrap()
            .and_hms_opt(9, 10, 0)
            .unwrap();
        Bill {
            id: 1,
            bill_no: 4,
            customer_name: None,
            total_amount: 65.0,
            payment_method: PaymentMethod::Cash,
            status: BillStatus::Confirmed,
            items: vec![
                BillItem {
                    product_id: "A1".to_string(),
                    name: "Cola".to_string(),
                    price: 25.0,
                    quantity: 2,
                },
                BillItem {
                    product_id: "B2".to_string(),
                    name: "Extra Large Meetha Paan Special".to_string(),
                    price: 15.0,
                    quantity: 1,
                },
            ],
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_every_line_fits_the_paper() {
        for width in [32, 42, 48] {
            let receipt = render_receipt(&bill(), &shop(), width);
            for line in &receipt.lines {
                assert!(line.chars().count() <= width, "{:?} wider than {}", line, width);
            }
        }
    }

    #[test]
    fn test_receipt_content() {
        let receipt = render_receipt(&bill(), &shop(), 32);
        assert_eq!(receipt.bill_no, 4);
        assert_eq!(receipt.lines[0].trim(), "My Shop");
        assert!(receipt.lines.iter().any(|l| l.starts_with("Bill #4") && l.ends_with("14-06-2024 09:10")));
        assert!(receipt.lines.iter().any(|l| l.starts_with("Cola") && l.ends_with("50.00")));
        assert!(receipt.lines.iter().any(|l| l.starts_with("TOTAL") && l.ends_with("Rs. 65.00")));
        // Empty phone is skipped.
        assert_eq!(receipt.lines[2], "-".repeat(32));
    }

    #[test]
    fn test_log_printer_succeeds() {
        let receipt = render_receipt(&bill(), &shop(), 32);
        LogPrinter.print(&receipt).unwrap();
    }
}

//! # Invoice Math
//!
//! Prices are tax-inclusive. An invoice splits the charged price back into
//! subtotal and tax at a fixed rate.
//!
//! ```text
//! price     = final price, or estimated − discount before one is fixed
//! subtotal  = round(price / (1 + rate))
//! tax       = price − subtotal
//! total     = price
//! ```

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::money::Money;
use crate::types::{Booking, TaxRate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvoiceAmounts {
    pub subtotal: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
}

pub fn compute_amounts(booking: &Booking, rate: TaxRate) -> InvoiceAmounts {
    let price = booking.charge_amount();
    let (subtotal, tax) = price.split_inclusive_tax(rate);
    InvoiceAmounts {
        subtotal,
        tax,
        discount: booking.discount(),
        total: price,
    }
}

/// `INV-YYYYMMDD-NNNN` with a random suffix. Uniqueness is enforced by the
/// store; callers retry on collision.
pub fn invoice_number(date: DateTime<Utc>) -> String {
    let suffix: u16 = rand::thread_rng().gen_range(0..10_000);
    format!("INV-{}-{:04}", date.format("%Y%m%d"), suffix)
}

//! Invoice derivation for completed visits.
//!
//! Pure functions only: the billing view hands in a saved `Visit` and gets
//! back the figures to render. Nothing here touches clinic state.

use crate::models::Visit;

/// Flat GST rate applied to every consultation.
pub const TAX_RATE: f64 = 0.18;

/// The figures printed on an invoice, each rounded to two decimals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvoiceTotals {
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
}

/// Rounds a currency amount to two decimal places.
pub fn round_to_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Computes invoice totals from a consultation fee.
///
/// `subtotal` is the fee itself, `tax` is the flat 18% GST, `total` is
/// their sum. All three come back rounded to two decimals.
pub fn totals_for_fee(consultation_fee: f64) -> InvoiceTotals {
    let subtotal = round_to_cents(consultation_fee);
    let tax = round_to_cents(subtotal * TAX_RATE);
    InvoiceTotals {
        subtotal,
        tax,
        total: round_to_cents(subtotal + tax),
    }
}

/// Computes invoice totals for a saved visit.
pub fn totals_for_visit(visit: &Visit) -> InvoiceTotals {
    totals_for_fee(visit.consultation_fee)
}

/// Builds the printed invoice number, e.g. `INV-2026-0042`.
///
/// The year comes from the visit date and the token number is zero-padded
/// to four digits.
pub fn invoice_number(visit: &Visit) -> String {
    format!("INV-{}-{:04}", visit.date.year(), visit.token_number)
}

/// Formats an amount as Indian rupees with en-IN digit grouping,
/// e.g. `₹1,18,000.00`.
///
/// Indian grouping puts the rightmost three integer digits together and
/// groups by two after that.
pub fn format_inr(amount: f64) -> String {
    let amount = round_to_cents(amount);
    let negative = amount < 0.0;
    let cents = (amount.abs() * 100.0).round() as u64;
    let rupees = cents / 100;
    let paise = cents % 100;

    let digits = rupees.to_string();
    let mut grouped = String::new();
    if digits.len() <= 3 {
        grouped.push_str(&digits);
    } else {
        let (head, tail) = digits.split_at(digits.len() - 3);
        let head_bytes = head.as_bytes();
        let mut start = head_bytes.len() % 2;
        if start == 1 {
            grouped.push(head_bytes[0] as char);
            if head_bytes.len() > 1 {
                grouped.push(',');
            }
        }
        while start < head_bytes.len() {
            grouped.push(head_bytes[start] as char);
            grouped.push(head_bytes[start + 1] as char);
            start += 2;
            if start < head_bytes.len() {
                grouped.push(',');
            }
        }
        grouped.push(',');
        grouped.push_str(tail);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}₹{grouped}.{paise:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use uuid::Uuid;

    fn sample_visit(fee: f64, token_number: u32) -> Visit {
        Visit {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            token_number,
            date: datetime!(2026-08-24 10:30 UTC),
            symptoms: "Fever, cough".into(),
            diagnosis: "Viral Infection".into(),
            prescription: "Rest and fluids".into(),
            consultation_fee: fee,
            doctor_name: "Dr. Anya Sharma".into(),
        }
    }

    #[test]
    fn standard_fee_gets_flat_18_percent_tax() {
        let totals = totals_for_fee(500.0);
        assert_eq!(totals.subtotal, 500.0);
        assert_eq!(totals.tax, 90.0);
        assert_eq!(totals.total, 590.0);
    }

    #[test]
    fn zero_fee_bills_zero() {
        let totals = totals_for_fee(0.0);
        assert_eq!(totals.subtotal, 0.0);
        assert_eq!(totals.tax, 0.0);
        assert_eq!(totals.total, 0.0);
    }

    #[test]
    fn totals_round_to_two_decimals() {
        // 333.33 * 0.18 = 59.9994 -> 60.00
        let totals = totals_for_fee(333.33);
        assert_eq!(totals.tax, 60.0);
        assert_eq!(totals.total, 393.33);
    }

    #[test]
    fn invoice_number_uses_visit_year_and_padded_token() {
        let visit = sample_visit(500.0, 42);
        assert_eq!(invoice_number(&visit), "INV-2026-0042");
    }

    #[test]
    fn inr_formatting_uses_indian_grouping() {
        assert_eq!(format_inr(590.0), "₹590.00");
        assert_eq!(format_inr(1180.0), "₹1,180.00");
        assert_eq!(format_inr(118000.0), "₹1,18,000.00");
        assert_eq!(format_inr(12345678.9), "₹1,23,45,678.90");
        assert_eq!(format_inr(0.0), "₹0.00");
    }

    #[test]
    fn visit_totals_match_fee_totals() {
        let visit = sample_visit(750.0, 7);
        assert_eq!(totals_for_visit(&visit), totals_for_fee(750.0));
    }
}

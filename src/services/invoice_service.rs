//! Invoice rendering and delivery.
//!
//! The invoice is a deterministic plain-text document: header, bill-to block,
//! line items (daily rate, advance, penalty when charged, total), terms
//! boilerplate. Delivery failure is reported to the admin and never retried.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::domain::money::{format_amount, parse_amount};
use crate::domain::DomainError;
use crate::mailer::Mailer;
use crate::models::{item, rental, user};
use crate::services::rental_service::{advance_amount, RENTAL_PERIOD_DAYS};

const TERMS: &[&str] = &[
    "1. Advance payment must be cleared before equipment pickup",
    "2. Equipment must be returned in original condition",
    "3. Any damages will incur additional charges",
    "4. Rental period starts from equipment pickup date",
    "5. Late returns will be charged extra",
];

pub fn render_invoice(
    invoiced: &rental::Model,
    renter: &user::Model,
    rented_item: &item::Model,
    now: DateTime<Utc>,
) -> Result<String, DomainError> {
    let price = parse_amount(&rented_item.price_per_day)?;
    let advance = advance_amount(price);
    let penalty = match &invoiced.penalty_amount {
        Some(p) => parse_amount(p)?,
        None => Decimal::ZERO,
    };
    let total = advance + penalty;

    let mut doc = String::new();
    doc.push_str("========================================\n");
    doc.push_str("            AGRIRENT INVOICE\n");
    doc.push_str("========================================\n");
    doc.push_str(&format!("Invoice #: INV-{:04}\n", invoiced.id));
    doc.push_str(&format!("Date: {}\n", now.format("%Y-%m-%d")));
    doc.push_str(&format!(
        "Due Date: {}\n",
        (now + Duration::days(RENTAL_PERIOD_DAYS)).format("%Y-%m-%d")
    ));
    doc.push('\n');

    doc.push_str("BILL TO:\n");
    doc.push_str(&format!("  Name: {}\n", renter.username));
    doc.push_str(&format!("  Email: {}\n", renter.email));
    doc.push_str(&format!(
        "  Phone: {}\n",
        renter.phone.as_deref().unwrap_or("-")
    ));
    doc.push_str(&format!(
        "  Address: {}\n",
        renter.address.as_deref().unwrap_or("-")
    ));
    doc.push('\n');

    doc.push_str("RENTAL DETAILS:\n");
    doc.push_str(&format!("  Equipment: {}\n", rented_item.name));
    doc.push_str(&format!("  Category: {}\n", rented_item.category));
    doc.push_str(&format!("  Daily Rate: {}\n", format_amount(price)));
    doc.push_str(&format!(
        "  Advance Payment (50%): {}\n",
        format_amount(advance)
    ));
    if penalty > Decimal::ZERO {
        doc.push_str(&format!("  Penalty Charge: {}\n", format_amount(penalty)));
    }
    doc.push_str(&format!("  TOTAL AMOUNT: {}\n", format_amount(total)));
    doc.push('\n');

    doc.push_str("TERMS & CONDITIONS:\n");
    for term in TERMS {
        doc.push_str(&format!("  {}\n", term));
    }
    doc.push('\n');
    doc.push_str("Thank you for choosing AgriRent!\n");

    Ok(doc)
}

/// Render and mail the invoice to the renter.
pub async fn email_invoice(
    mailer: &dyn Mailer,
    invoiced: &rental::Model,
    renter: &user::Model,
    rented_item: &item::Model,
) -> Result<(), DomainError> {
    let document = render_invoice(invoiced, renter, rented_item, Utc::now())?;
    let subject = format!("AgriRent Invoice for {}", rented_item.name);
    mailer.send(&renter.email, &subject, &document).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (rental::Model, user::Model, item::Model) {
        let invoiced = rental::Model {
            id: 42,
            user_id: 1,
            item_id: 1,
            request_date: "2026-01-01T00:00:00+00:00".to_string(),
            status: "approved".to_string(),
            terms_accepted: true,
            advance_paid: true,
            payment_reference: Some("ref-1".to_string()),
            approved_at: Some("2026-01-02T00:00:00+00:00".to_string()),
            damage_report: None,
            penalty_amount: None,
            return_date: None,
            is_returned: false,
            return_condition: None,
            return_notes: None,
            admin_return_notes: None,
            refund_processed: false,
            refund_amount: None,
            refund_date: None,
            deadline_notice_sent: false,
            updated_at: "2026-01-02T00:00:00+00:00".to_string(),
        };
        let renter = user::Model {
            id: 1,
            username: "ravi".to_string(),
            email: "ravi@example.com".to_string(),
            role: "user".to_string(),
            phone: Some("555-0101".to_string()),
            address: None,
            status: "approved".to_string(),
            password_hash: None,
            id_number: None,
            id_doc_front: None,
            id_doc_back: None,
            is_verified: true,
            verified_at: None,
            wallet_balance: "0.00".to_string(),
            created_at: "2026-01-01T00:00:00+00:00".to_string(),
            updated_at: "2026-01-01T00:00:00+00:00".to_string(),
        };
        let rented_item = item::Model {
            id: 1,
            name: "Power Tiller".to_string(),
            category: "Ploughs".to_string(),
            description: "Heavy duty".to_string(),
            price_per_day: "200.00".to_string(),
            image_url: None,
            is_available: false,
            added_by: 2,
            is_new: false,
            new_until: None,
            created_at: "2026-01-01T00:00:00+00:00".to_string(),
            updated_at: "2026-01-01T00:00:00+00:00".to_string(),
        };
        (invoiced, renter, rented_item)
    }

    #[test]
    fn renders_deterministic_layout() {
        let (invoiced, renter, rented_item) = fixture();
        let now = "2026-02-01T10:00:00Z".parse().unwrap();

        let a = render_invoice(&invoiced, &renter, &rented_item, now).unwrap();
        let b = render_invoice(&invoiced, &renter, &rented_item, now).unwrap();
        assert_eq!(a, b);

        assert!(a.contains("Invoice #: INV-0042"));
        assert!(a.contains("Date: 2026-02-01"));
        assert!(a.contains("Due Date: 2026-02-08"));
        assert!(a.contains("Advance Payment (50%): 100.00"));
        assert!(a.contains("TOTAL AMOUNT: 100.00"));
        assert!(!a.contains("Penalty Charge"));
    }

    #[test]
    fn penalty_line_appears_only_when_charged() {
        let (mut invoiced, renter, rented_item) = fixture();
        invoiced.penalty_amount = Some("40.00".to_string());
        let now = "2026-02-01T10:00:00Z".parse().unwrap();

        let doc = render_invoice(&invoiced, &renter, &rented_item, now).unwrap();
        assert!(doc.contains("Penalty Charge: 40.00"));
        assert!(doc.contains("TOTAL AMOUNT: 140.00"));
    }
}

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::{AuditMeta, Named};
use crate::store::{Document, UniqueKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuotationStatus {
    Draft,
    Unapproved,
    Approved,
    Rejected,
}

impl QuotationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuotationStatus::Draft => "Draft",
            QuotationStatus::Unapproved => "Unapproved",
            QuotationStatus::Approved => "Approved",
            QuotationStatus::Rejected => "Rejected",
        }
    }

    /// Content edits are only accepted while drafting
    pub fn is_editable(&self) -> bool {
        *self == QuotationStatus::Draft
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quotation {
    pub id: String,
    pub quotation_number: String,
    pub opportunity_id: String,
    pub company_id: String,
    pub title: String,
    pub currency: String,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
    pub status: QuotationStatus,
    pub version: u32,
    pub submitted_by: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    #[serde(flatten)]
    pub meta: AuditMeta,
}

impl Document for Quotation {
    const COLLECTION: &'static str = "quotations";
    const ENTITY: &'static str = "Quotation";

    fn id(&self) -> &str {
        &self.id
    }
    fn meta(&self) -> &AuditMeta {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut AuditMeta {
        &mut self.meta
    }
    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::single("quotation_number", self.quotation_number.as_str())]
    }
}

impl Named for Quotation {
    fn display_name(&self) -> String {
        self.quotation_number.clone()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotationPhase {
    pub id: String,
    pub quotation_id: String,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i32,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(flatten)]
    pub meta: AuditMeta,
}

impl Document for QuotationPhase {
    const COLLECTION: &'static str = "quotation_phases";
    const ENTITY: &'static str = "Quotation phase";

    fn id(&self) -> &str {
        &self.id
    }
    fn meta(&self) -> &AuditMeta {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut AuditMeta {
        &mut self.meta
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotationGroup {
    pub id: String,
    pub quotation_id: String,
    pub phase_id: String,
    pub name: String,
    pub sort_order: i32,
    #[serde(flatten)]
    pub meta: AuditMeta,
}

impl Document for QuotationGroup {
    const COLLECTION: &'static str = "quotation_groups";
    const ENTITY: &'static str = "Quotation group";

    fn id(&self) -> &str {
        &self.id
    }
    fn meta(&self) -> &AuditMeta {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut AuditMeta {
        &mut self.meta
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotationItem {
    pub id: String,
    pub quotation_id: String,
    pub group_id: String,
    pub description: String,
    pub product_type_id: Option<String>,
    pub unit: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub discount_percent: Decimal,
    pub tax_percent: Decimal,
    pub sort_order: i32,
    #[serde(flatten)]
    pub meta: AuditMeta,
}

impl Document for QuotationItem {
    const COLLECTION: &'static str = "quotation_items";
    const ENTITY: &'static str = "Quotation item";

    fn id(&self) -> &str {
        &self.id
    }
    fn meta(&self) -> &AuditMeta {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut AuditMeta {
        &mut self.meta
    }
}

/// Money amounts for a line, group, phase or whole quotation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub taxable: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

fn money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

impl Totals {
    pub fn for_item(item: &QuotationItem) -> Self {
        let subtotal = money(item.quantity * item.unit_price);
        let discount = money(subtotal * item.discount_percent / Decimal::ONE_HUNDRED);
        let taxable = subtotal - discount;
        let tax = money(taxable * item.tax_percent / Decimal::ONE_HUNDRED);
        Self {
            subtotal,
            discount,
            taxable,
            tax,
            total: taxable + tax,
        }
    }

    pub fn sum<'a>(parts: impl IntoIterator<Item = &'a Totals>) -> Self {
        parts.into_iter().fold(Totals::default(), |acc, t| Totals {
            subtotal: acc.subtotal + t.subtotal,
            discount: acc.discount + t.discount,
            taxable: acc.taxable + t.taxable,
            tax: acc.tax + t.tax,
            total: acc.total + t.total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn item(quantity: &str, unit_price: &str, discount: &str, tax: &str) -> QuotationItem {
        QuotationItem {
            id: "i".to_string(),
            quotation_id: "q".to_string(),
            group_id: "g".to_string(),
            description: "Licence".to_string(),
            product_type_id: None,
            unit: None,
            quantity: Decimal::from_str(quantity).unwrap(),
            unit_price: Decimal::from_str(unit_price).unwrap(),
            discount_percent: Decimal::from_str(discount).unwrap(),
            tax_percent: Decimal::from_str(tax).unwrap(),
            sort_order: 0,
            meta: AuditMeta::created_by("u"),
        }
    }

    #[test]
    fn line_totals_apply_discount_before_tax() {
        let totals = Totals::for_item(&item("10", "100", "10", "18"));
        assert_eq!(totals.subtotal, Decimal::from(1000));
        assert_eq!(totals.discount, Decimal::from(100));
        assert_eq!(totals.taxable, Decimal::from(900));
        assert_eq!(totals.tax, Decimal::from(162));
        assert_eq!(totals.total, Decimal::from(1062));
    }

    #[test]
    fn amounts_round_half_away_from_zero() {
        let totals = Totals::for_item(&item("1", "0.125", "0", "0"));
        assert_eq!(totals.subtotal, Decimal::from_str("0.13").unwrap());
    }

    #[test]
    fn only_drafts_are_editable() {
        assert!(QuotationStatus::Draft.is_editable());
        assert!(!QuotationStatus::Unapproved.is_editable());
        assert!(!QuotationStatus::Approved.is_editable());
        assert!(!QuotationStatus::Rejected.is_editable());
    }

    proptest! {
        #[test]
        fn line_total_is_taxable_plus_tax(
            qty in 1u32..1000,
            price_cents in 0u64..10_000_000,
            discount in 0u32..=100,
            tax in 0u32..=100,
        ) {
            let mut line = item("1", "0", "0", "0");
            line.quantity = Decimal::from(qty);
            line.unit_price = Decimal::new(price_cents as i64, 2);
            line.discount_percent = Decimal::from(discount);
            line.tax_percent = Decimal::from(tax);
            let totals = Totals::for_item(&line);
            prop_assert_eq!(totals.total, totals.taxable + totals.tax);
            prop_assert!(totals.discount <= totals.subtotal);
            prop_assert!(totals.taxable >= Decimal::ZERO);
        }

        #[test]
        fn sum_is_additive(a in 0u64..1_000_000, b in 0u64..1_000_000) {
            let mut first = item("1", "0", "0", "0");
            first.unit_price = Decimal::new(a as i64, 2);
            let mut second = item("1", "0", "0", "0");
            second.unit_price = Decimal::new(b as i64, 2);
            let lines = [Totals::for_item(&first), Totals::for_item(&second)];
            let sum = Totals::sum(lines.iter());
            prop_assert_eq!(sum.total, lines[0].total + lines[1].total);
        }
    }
}

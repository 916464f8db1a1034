use regex::Regex;
use rust_decimal::Decimal;
use std::sync::LazyLock;
use tracing::error;

use crate::error::ValidationErrors;

// A pattern that fails to compile matches nothing, so the field is reported invalid
static EMAIL_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
});

static GST_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"^[0-9]{2}[A-Z]{5}[0-9]{4}[A-Z][1-9A-Z]Z[0-9A-Z]$"));

static PAN_RE: LazyLock<Option<Regex>> = LazyLock::new(|| compile(r"^[A-Z]{5}[0-9]{4}[A-Z]$"));

static PHONE_RE: LazyLock<Option<Regex>> = LazyLock::new(|| compile(r"^\+?[0-9][0-9 \-]{5,19}$"));

fn compile(pattern: &str) -> Option<Regex> {
    Regex::new(pattern)
        .map_err(|e| error!(pattern, error = %e, "Validation pattern failed to compile"))
        .ok()
}

fn is_match(re: &Option<Regex>, value: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(value))
}

/// Trim and drop empty strings
pub fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn clean_upper(value: Option<String>) -> Option<String> {
    clean(value).map(|v| v.to_uppercase())
}

pub fn clean_lower(value: Option<String>) -> Option<String> {
    clean(value).map(|v| v.to_lowercase())
}

pub fn is_valid_email(email: &str) -> bool {
    is_match(&EMAIL_RE, email)
}

pub fn is_valid_gst(gst: &str) -> bool {
    is_match(&GST_RE, gst)
}

pub fn is_valid_pan(pan: &str) -> bool {
    is_match(&PAN_RE, pan)
}

pub fn is_valid_phone(phone: &str) -> bool {
    is_match(&PHONE_RE, phone)
}

pub fn require_text(errors: &mut ValidationErrors, field: &str, value: &str) {
    errors.check(!value.trim().is_empty(), field, "is required");
}

pub fn check_email(errors: &mut ValidationErrors, field: &str, email: Option<&str>) {
    if let Some(email) = email {
        errors.check(is_valid_email(email), field, "is not a valid email address");
    }
}

pub fn check_phone(errors: &mut ValidationErrors, field: &str, phone: Option<&str>) {
    if let Some(phone) = phone {
        errors.check(is_valid_phone(phone), field, "is not a valid phone number");
    }
}

/// GST and PAN formats, plus the PAN embedded in a GST number
pub fn check_tax_ids(errors: &mut ValidationErrors, gst: Option<&str>, pan: Option<&str>) {
    let gst_ok = gst.map(is_valid_gst);
    let pan_ok = pan.map(is_valid_pan);
    if gst_ok == Some(false) {
        errors.add("gst_number", "must be a 15 character GSTIN such as 27AAPFU0939F1ZV");
    }
    if pan_ok == Some(false) {
        errors.add("pan_number", "must be a 10 character PAN such as AAPFU0939F");
    }
    if let (Some(gst), Some(pan), Some(true), Some(true)) = (gst, pan, gst_ok, pan_ok) {
        if &gst[2..12] != pan {
            errors.add("gst_number", "characters 3 to 12 must match the PAN");
        }
    }
}

pub fn check_percent(errors: &mut ValidationErrors, field: &str, value: Decimal) {
    errors.check(
        value >= Decimal::ZERO && value <= Decimal::ONE_HUNDRED,
        field,
        "must be between 0 and 100",
    );
}

pub fn check_non_negative(errors: &mut ValidationErrors, field: &str, value: Decimal) {
    errors.check(value >= Decimal::ZERO, field, "must not be negative");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broken_patterns_reject_instead_of_panicking() {
        let broken = compile(r"^[A-Z");
        assert!(broken.is_none());
        assert!(!is_match(&broken, "ABC"));
        assert!(is_match(&compile(r"^[A-Z]+$"), "ABC"));
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("ops@acme.co.in"));
        assert!(is_valid_email("first.last+tag@example.com"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("a@b"));
    }

    #[test]
    fn gst_must_embed_the_pan() {
        let mut errors = ValidationErrors::new();
        check_tax_ids(&mut errors, Some("27AAPFU0939F1ZV"), Some("AAPFU0939F"));
        assert!(errors.is_empty());

        let mut errors = ValidationErrors::new();
        check_tax_ids(&mut errors, Some("27AAPFU0939F1ZV"), Some("BBBBB1234B"));
        assert_eq!(errors.errors().len(), 1);
        assert_eq!(errors.errors()[0].field, "gst_number");
    }

    #[test]
    fn malformed_tax_ids_are_reported_separately() {
        let mut errors = ValidationErrors::new();
        check_tax_ids(&mut errors, Some("27AAPFU0939F1Z"), Some("AAPF0939F"));
        let fields: Vec<_> = errors.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["gst_number", "pan_number"]);

        assert!(!is_valid_gst("27AAPFU0939F0ZV"));
    }

    #[test]
    fn clean_trims_and_drops_blanks() {
        assert_eq!(clean(Some("  x ".to_string())), Some("x".to_string()));
        assert_eq!(clean(Some("   ".to_string())), None);
        assert_eq!(clean_upper(Some(" aapfu0939f ".to_string())).as_deref(), Some("AAPFU0939F"));
    }

    #[test]
    fn percent_bounds() {
        let mut errors = ValidationErrors::new();
        check_percent(&mut errors, "discount_percent", Decimal::from(100));
        check_percent(&mut errors, "tax_percent", Decimal::from(101));
        check_percent(&mut errors, "commission_percent", Decimal::from(-1));
        assert_eq!(errors.errors().len(), 2);
    }
}

//! Boundary checks for contact rows and the dedup key built from them.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{DialerError, Result};
use crate::model::{Contact, ContactField, CustomFields, NewContact};

static PHONE_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+$").expect("valid regex"));

/// Separator between key parts; cannot appear in trimmed user input that
/// was typed or imported from CSV.
const KEY_SEPARATOR: char = '\u{1f}';

/// Trim the phone number and require ASCII digits only.
pub fn normalize_phone(raw: &str) -> Result<String> {
    let phone = raw.trim();
    if phone.is_empty() {
        return Err(DialerError::validation("phone number is required"));
    }
    if !PHONE_DIGITS.is_match(phone) {
        return Err(DialerError::validation(format!(
            "phone number '{}' must contain digits only",
            phone
        )));
    }
    Ok(phone.to_string())
}

/// A contact row that passed boundary validation
#[derive(Debug, Clone)]
pub struct ValidatedContact {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: String,
    pub postal_code: Option<String>,
    pub custom_fields: CustomFields,
}

impl ValidatedContact {
    pub fn field_value(&self, field: &ContactField) -> Option<&str> {
        match field {
            ContactField::PhoneNumber => Some(self.phone_number.as_str()),
            ContactField::FirstName => self.first_name.as_deref(),
            ContactField::LastName => self.last_name.as_deref(),
            ContactField::PostalCode => self.postal_code.as_deref(),
            ContactField::Custom(key) => self.custom_fields.get(key),
        }
    }
}

/// Validate a caller-supplied row
pub fn validate_contact(row: &NewContact) -> Result<ValidatedContact> {
    let phone_number = normalize_phone(&row.phone_number)?;
    let custom_fields = CustomFields::from_user_input(row.custom_fields.clone())?;

    Ok(ValidatedContact {
        first_name: non_blank(row.first_name.as_deref()),
        last_name: non_blank(row.last_name.as_deref()),
        phone_number,
        postal_code: non_blank(row.postal_code.as_deref()),
        custom_fields,
    })
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Composite dedup key: each configured field trimmed and lowercased, missing
/// fields contributing an empty part.
pub fn dedup_key<'a, F>(fields: &[ContactField], value_of: F) -> String
where
    F: Fn(&ContactField) -> Option<&'a str>,
{
    let mut key = String::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            key.push(KEY_SEPARATOR);
        }
        if let Some(value) = value_of(field) {
            key.push_str(&value.trim().to_lowercase());
        }
    }
    key
}

pub fn contact_dedup_key(fields: &[ContactField], contact: &Contact) -> String {
    dedup_key(fields, |f| contact.field_value(f))
}

pub fn row_dedup_key(fields: &[ContactField], row: &ValidatedContact) -> String {
    dedup_key(fields, |f| row.field_value(f))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_normalization() {
        assert_eq!(normalize_phone(" 0612345678 ").unwrap(), "0612345678");
        assert!(normalize_phone("").is_err());
        assert!(normalize_phone("   ").is_err());
        assert!(normalize_phone("06-12-34").is_err());
        assert!(normalize_phone("+33612345678").is_err());
        assert!(normalize_phone("06１２").is_err());
    }

    #[test]
    fn test_validate_contact_drops_blank_optionals() {
        let mut row = NewContact::with_phone("0600000001");
        row.first_name = Some("  ".to_string());
        row.postal_code = Some(" 75001 ".to_string());

        let valid = validate_contact(&row).unwrap();
        assert_eq!(valid.first_name, None);
        assert_eq!(valid.postal_code.as_deref(), Some("75001"));
    }

    #[test]
    fn test_dedup_key_is_case_and_space_insensitive() {
        let fields = vec![ContactField::PhoneNumber, ContactField::LastName];

        let mut a = NewContact::with_phone("0600000001");
        a.last_name = Some("Durand".to_string());
        let mut b = NewContact::with_phone("0600000001");
        b.last_name = Some(" durand".to_string());
        let c = NewContact::with_phone("0600000001");

        let ka = row_dedup_key(&fields, &validate_contact(&a).unwrap());
        let kb = row_dedup_key(&fields, &validate_contact(&b).unwrap());
        let kc = row_dedup_key(&fields, &validate_contact(&c).unwrap());
        assert_eq!(ka, kb);
        assert_ne!(ka, kc);
    }
}

//! Typed extraction from jCard (RFC 7095) contact arrays.
//!
//! A jCard looks like:
//! ```text
//! ["vcard", [
//!   ["version", {}, "text", "4.0"],
//!   ["fn", {}, "text", "Jane Doe"],
//!   ["org", {}, "text", "Example Ltd"],
//!   ["email", {}, "text", "jane@example.com"],
//!   ["tel", {"type": "voice"}, "uri", "tel:+44.2071234567"],
//!   ["adr", {"cc": "GB"}, "text", ["", "", "1 Street", "London", "", "N1", "United Kingdom"]]
//! ]]
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static TEL_URI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(?:tel:)?([^;]+)").expect("Invalid tel URI regex"));

/// Contact fields pulled from one entity's card. Absent fields stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactCard {
    pub name: Option<String>,
    pub email: Option<String>,
    pub organization: Option<String>,
    pub phone: Option<String>,
    pub country: Option<String>,
}

impl ContactCard {
    pub fn from_jcard(jcard: &Value) -> Self {
        let mut card = ContactCard::default();

        let Some(properties) = jcard
            .as_array()
            .and_then(|arr| arr.get(1))
            .and_then(Value::as_array)
        else {
            return card;
        };

        for property in properties.iter().filter_map(Value::as_array) {
            if property.len() < 4 {
                continue;
            }
            let Some(name) = property[0].as_str() else {
                continue;
            };
            let params = &property[1];
            let value = &property[3];

            match name.to_ascii_lowercase().as_str() {
                "fn" => set_once(&mut card.name, text_value(value)),
                "email" => set_once(&mut card.email, text_value(value)),
                "org" => set_once(&mut card.organization, text_value(value)),
                "tel" => set_once(&mut card.phone, text_value(value).and_then(|t| phone_from_uri(&t))),
                "adr" => set_once(&mut card.country, address_country(params, value)),
                _ => {}
            }
        }

        card
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.organization.is_none()
            && self.phone.is_none()
            && self.country.is_none()
    }

    pub fn has_name_or_email(&self) -> bool {
        self.name.is_some() || self.email.is_some()
    }

    /// Fills fields missing here from `other`; present fields are never replaced.
    pub fn fill_missing(&mut self, other: ContactCard) {
        set_once(&mut self.name, other.name);
        set_once(&mut self.email, other.email);
        set_once(&mut self.organization, other.organization);
        set_once(&mut self.phone, other.phone);
        set_once(&mut self.country, other.country);
    }
}

fn set_once(slot: &mut Option<String>, value: Option<String>) {
    if slot.is_none() {
        *slot = value;
    }
}

/// String value of a property; structured values (e.g. `org` units) use the first non-empty part.
fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(s),
        Value::Array(parts) => parts.iter().find_map(|p| p.as_str().and_then(non_empty)),
        _ => None,
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn phone_from_uri(raw: &str) -> Option<String> {
    TEL_URI
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .and_then(|m| non_empty(m.as_str()))
}

/// Explicit country code of an `adr` property: the `cc` parameter, else a
/// two-letter final address component.
fn address_country(params: &Value, value: &Value) -> Option<String> {
    if let Some(cc) = params.get("cc").and_then(Value::as_str).and_then(as_country_code) {
        return Some(cc);
    }

    value
        .as_array()
        .and_then(|parts| parts.last())
        .and_then(Value::as_str)
        .and_then(as_country_code)
}

fn as_country_code(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.len() == 2 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(trimmed.to_ascii_uppercase())
    } else {
        None
    }
}

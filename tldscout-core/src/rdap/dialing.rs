//! Best-effort country inference from international dialing codes.

use once_cell::sync::Lazy;
use std::collections::HashMap;

static DIALING_CODES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();

    // North America and Russia
    m.insert("1", "US");
    m.insert("7", "RU");

    // Two-digit codes
    m.insert("20", "EG");
    m.insert("27", "ZA");
    m.insert("30", "GR");
    m.insert("31", "NL");
    m.insert("32", "BE");
    m.insert("33", "FR");
    m.insert("34", "ES");
    m.insert("36", "HU");
    m.insert("39", "IT");
    m.insert("40", "RO");
    m.insert("41", "CH");
    m.insert("43", "AT");
    m.insert("44", "GB");
    m.insert("45", "DK");
    m.insert("46", "SE");
    m.insert("47", "NO");
    m.insert("48", "PL");
    m.insert("49", "DE");
    m.insert("51", "PE");
    m.insert("52", "MX");
    m.insert("53", "CU");
    m.insert("54", "AR");
    m.insert("55", "BR");
    m.insert("56", "CL");
    m.insert("57", "CO");
    m.insert("58", "VE");
    m.insert("60", "MY");
    m.insert("61", "AU");
    m.insert("62", "ID");
    m.insert("63", "PH");
    m.insert("64", "NZ");
    m.insert("65", "SG");
    m.insert("66", "TH");
    m.insert("81", "JP");
    m.insert("82", "KR");
    m.insert("84", "VN");
    m.insert("86", "CN");
    m.insert("90", "TR");
    m.insert("91", "IN");
    m.insert("92", "PK");
    m.insert("93", "AF");
    m.insert("94", "LK");
    m.insert("95", "MM");
    m.insert("98", "IR");

    // Three-digit codes
    m.insert("212", "MA");
    m.insert("213", "DZ");
    m.insert("216", "TN");
    m.insert("234", "NG");
    m.insert("254", "KE");
    m.insert("351", "PT");
    m.insert("352", "LU");
    m.insert("353", "IE");
    m.insert("354", "IS");
    m.insert("356", "MT");
    m.insert("357", "CY");
    m.insert("358", "FI");
    m.insert("359", "BG");
    m.insert("370", "LT");
    m.insert("371", "LV");
    m.insert("372", "EE");
    m.insert("380", "UA");
    m.insert("381", "RS");
    m.insert("385", "HR");
    m.insert("386", "SI");
    m.insert("420", "CZ");
    m.insert("421", "SK");
    m.insert("852", "HK");
    m.insert("880", "BD");
    m.insert("886", "TW");
    m.insert("966", "SA");
    m.insert("971", "AE");
    m.insert("972", "IL");
    m.insert("974", "QA");

    m
});

/// ISO 3166 alpha-2 code for the dialing code `phone` starts with.
///
/// Leading `+`/`00` and separators are ignored. The longest matching code
/// (3, then 2, then 1 digits) wins.
pub fn country_for_phone(phone: &str) -> Option<&'static str> {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    let international = phone.trim_start().starts_with('+');
    let digits = match digits.strip_prefix("00") {
        Some(rest) if !international => rest,
        _ => digits.as_str(),
    };

    (1..=3)
        .rev()
        .filter(|len| digits.len() > *len)
        .find_map(|len| DIALING_CODES.get(&digits[..len]).copied())
}

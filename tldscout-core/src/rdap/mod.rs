mod client;
mod dialing;
mod parser;
mod types;
mod vcard;

pub use client::{RdapClient, RegistryLookup, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
pub use dialing::country_for_phone;
pub use parser::parse;
pub use types::{ContactRole, RdapEntity, RdapEvent, RdapNameserver, RdapResponse};
pub use vcard::ContactCard;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::vcard::ContactCard;

/// Domain object returned by a registry lookup service.
///
/// Every field is optional: registries differ wildly in what they publish.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RdapResponse {
    #[serde(default)]
    pub object_class_name: Option<String>,

    #[serde(default)]
    pub handle: Option<String>,

    #[serde(default)]
    pub ldh_name: Option<String>,

    #[serde(default)]
    pub unicode_name: Option<String>,

    #[serde(default)]
    pub status: Vec<String>,

    #[serde(default)]
    pub events: Vec<RdapEvent>,

    #[serde(default)]
    pub entities: Vec<RdapEntity>,

    #[serde(default)]
    pub nameservers: Vec<RdapNameserver>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RdapEvent {
    pub event_action: String,
    #[serde(default)]
    pub event_date: Option<String>,
}

impl RdapEvent {
    pub fn parsed_date(&self) -> Option<DateTime<Utc>> {
        self.event_date.as_ref()?.parse().ok()
    }
}

/// Role an entity plays for the domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactRole {
    Registrant,
    Administrative,
    Technical,
    Registrar,
    Abuse,
    Other(String),
}

impl ContactRole {
    pub fn parse(role: &str) -> Self {
        match role.trim().to_ascii_lowercase().as_str() {
            "registrant" => ContactRole::Registrant,
            "administrative" => ContactRole::Administrative,
            "technical" => ContactRole::Technical,
            "registrar" => ContactRole::Registrar,
            "abuse" => ContactRole::Abuse,
            other => ContactRole::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RdapEntity {
    #[serde(default)]
    pub handle: Option<String>,

    #[serde(default)]
    pub roles: Vec<String>,

    #[serde(default)]
    pub vcard_array: Option<serde_json::Value>,

    #[serde(default)]
    pub entities: Vec<RdapEntity>,
}

impl RdapEntity {
    pub fn has_role(&self, role: &ContactRole) -> bool {
        self.roles.iter().any(|r| ContactRole::parse(r) == *role)
    }

    /// Typed view of the entity's jCard; empty when the card is absent or malformed.
    pub fn contact_card(&self) -> ContactCard {
        self.vcard_array
            .as_ref()
            .map(ContactCard::from_jcard)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RdapNameserver {
    #[serde(default)]
    pub ldh_name: Option<String>,

    #[serde(default)]
    pub unicode_name: Option<String>,
}

impl RdapResponse {
    pub fn domain_name(&self) -> Option<&str> {
        self.ldh_name.as_deref().or(self.unicode_name.as_deref())
    }

    pub fn registration_date(&self) -> Option<DateTime<Utc>> {
        self.events
            .iter()
            .find(|e| e.event_action.eq_ignore_ascii_case("registration"))
            .and_then(|e| e.parsed_date())
    }

    pub fn nameserver_names(&self) -> Vec<String> {
        self.nameservers
            .iter()
            .filter_map(|ns| ns.ldh_name.clone().or_else(|| ns.unicode_name.clone()))
            .collect()
    }

    /// All entities, nested ones included, in document order.
    pub fn all_entities(&self) -> Vec<&RdapEntity> {
        fn walk<'a>(entities: &'a [RdapEntity], out: &mut Vec<&'a RdapEntity>) {
            for entity in entities {
                out.push(entity);
                walk(&entity.entities, out);
            }
        }

        let mut out = Vec::new();
        walk(&self.entities, &mut out);
        out
    }
}

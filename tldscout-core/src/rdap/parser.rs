//! Extraction of an [`EnrichmentRecord`] from an RDAP domain response.
//!
//! Registrant fields come from an ordered heuristic pipeline:
//! 1. the best contact entity (registrant, then administrative, then technical);
//! 2. the registrar's abuse contact, when step 1 found neither name nor email;
//! 3. for a missing country, any explicit address country code, then the
//!    registrant phone's dialing code.
//!
//! Nothing is invented: a field no heuristic finds stays `None`.

use tracing::debug;

use super::dialing::country_for_phone;
use super::types::{ContactRole, RdapEntity, RdapResponse};
use super::vcard::ContactCard;
use crate::record::{EnrichmentRecord, RecordSource, Registrant};

const CONTACT_PREFERENCE: [ContactRole; 3] = [
    ContactRole::Registrant,
    ContactRole::Administrative,
    ContactRole::Technical,
];

pub fn parse(response: &RdapResponse) -> EnrichmentRecord {
    let mut card = preferred_contact(response).unwrap_or_default();

    if !card.has_name_or_email() {
        if let Some(abuse) = registrar_abuse_contact(response) {
            debug!("Using registrar abuse contact");
            card.fill_missing(abuse);
        }
    }

    if card.country.is_none() {
        card.country = explicit_country(response)
            .or_else(|| card.phone.as_deref().and_then(country_for_phone).map(String::from));
    }

    EnrichmentRecord {
        registrant: Registrant {
            name: card.name,
            email: card.email,
            organization: card.organization,
            phone: card.phone,
            country: card.country,
        },
        nameservers: response.nameserver_names(),
        status: response.status.first().cloned(),
        registration_date: response.registration_date(),
        source: RecordSource::Registry,
    }
}

fn contact_rank(entity: &RdapEntity) -> Option<usize> {
    CONTACT_PREFERENCE
        .iter()
        .position(|role| entity.has_role(role))
}

/// Card of the highest-ranked contact entity with any data; first in
/// document order on ties. Redacted (empty) cards are passed over.
fn preferred_contact(response: &RdapResponse) -> Option<ContactCard> {
    response
        .all_entities()
        .into_iter()
        .filter_map(|entity| contact_rank(entity).map(|rank| (rank, entity.contact_card())))
        .filter(|(_, card)| !card.is_empty())
        .min_by_key(|(rank, _)| *rank)
        .map(|(_, card)| card)
}

fn registrar_abuse_contact(response: &RdapResponse) -> Option<ContactCard> {
    let registrar = response
        .entities
        .iter()
        .find(|e| e.has_role(&ContactRole::Registrar))?;
    let abuse = registrar
        .entities
        .iter()
        .find(|e| e.has_role(&ContactRole::Abuse))?;

    let mut card = abuse.contact_card();
    if card.organization.is_none() {
        card.organization = card.name.clone();
    }

    if card.is_empty() {
        None
    } else {
        Some(card)
    }
}

fn explicit_country(response: &RdapResponse) -> Option<String> {
    response
        .all_entities()
        .into_iter()
        .find_map(|entity| entity.contact_card().country)
}

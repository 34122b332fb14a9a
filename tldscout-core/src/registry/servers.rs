use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Primary RDAP service for TLDs with no entry in [`RDAP_SERVERS`].
pub const DEFAULT_RDAP_SERVER: &str = "https://rdap.org/";

/// Generic RDAP services tried, in order, once a TLD's primary is blocked or down.
pub const FALLBACK_RDAP_SERVERS: [&str; 3] = [
    "https://rdap.org/",
    "https://rdap.net/",
    "https://rdap.iana.org/",
];

pub static RDAP_SERVERS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();

    // Verisign
    m.insert("com", "https://rdap.verisign.com/com/v1/");
    m.insert("net", "https://rdap.verisign.com/net/v1/");
    m.insert("cc", "https://rdap.verisign.com/cc/v1/");
    m.insert("tv", "https://rdap.verisign.com/tv/v1/");
    m.insert("name", "https://rdap.verisign.com/name/v1/");

    // Legacy gTLDs
    m.insert("org", "https://rdap.publicinterestregistry.org/rdap/");
    m.insert("info", "https://rdap.identitydigital.services/rdap/");
    m.insert("mobi", "https://rdap.identitydigital.services/rdap/");
    m.insert("pro", "https://rdap.identitydigital.services/rdap/");
    m.insert("biz", "https://rdap.nic.biz/");
    m.insert("asia", "https://rdap.identitydigital.services/rdap/");

    // Google Registry
    m.insert("app", "https://pubapi.registry.google/rdap/");
    m.insert("dev", "https://pubapi.registry.google/rdap/");
    m.insert("page", "https://pubapi.registry.google/rdap/");
    m.insert("new", "https://pubapi.registry.google/rdap/");

    // CentralNic
    m.insert("xyz", "https://rdap.centralnic.com/xyz/");
    m.insert("online", "https://rdap.centralnic.com/online/");
    m.insert("site", "https://rdap.centralnic.com/site/");
    m.insert("store", "https://rdap.centralnic.com/store/");
    m.insert("tech", "https://rdap.centralnic.com/tech/");
    m.insert("space", "https://rdap.centralnic.com/space/");
    m.insert("website", "https://rdap.centralnic.com/website/");
    m.insert("fun", "https://rdap.centralnic.com/fun/");

    // Identity Digital
    m.insert("io", "https://rdap.identitydigital.services/rdap/");
    m.insert("ai", "https://rdap.identitydigital.services/rdap/");
    m.insert("me", "https://rdap.identitydigital.services/rdap/");
    m.insert("live", "https://rdap.identitydigital.services/rdap/");
    m.insert("digital", "https://rdap.identitydigital.services/rdap/");
    m.insert("agency", "https://rdap.identitydigital.services/rdap/");
    m.insert("company", "https://rdap.identitydigital.services/rdap/");
    m.insert("solutions", "https://rdap.identitydigital.services/rdap/");
    m.insert("services", "https://rdap.identitydigital.services/rdap/");
    m.insert("email", "https://rdap.identitydigital.services/rdap/");
    m.insert("group", "https://rdap.identitydigital.services/rdap/");

    // Other popular gTLDs
    m.insert("co", "https://rdap.registry.co/co/");
    m.insert("shop", "https://rdap.gmoregistry.net/rdap/");
    m.insert("blog", "https://rdap.blog.fury.ca/rdap/");
    m.insert("cloud", "https://rdap.registry.cloud/rdap/");

    // Country codes with public RDAP services
    m.insert("us", "https://rdap.nic.us/");
    m.insert("uk", "https://rdap.nominet.uk/uk/");
    m.insert("fr", "https://rdap.nic.fr/");
    m.insert("nl", "https://rdap.sidn.nl/");
    m.insert("br", "https://rdap.registro.br/");
    m.insert("ca", "https://rdap.ca.fury.ca/rdap/");
    m.insert("be", "https://rdap.dnsbelgium.be/");
    m.insert("cz", "https://rdap.nic.cz/");
    m.insert("no", "https://rdap.norid.no/");
    m.insert("fi", "https://rdap.fi/rdap/rdap/");
    m.insert("pl", "https://rdap.dns.pl/");
    m.insert("in", "https://rdap.registry.in/");

    m
});

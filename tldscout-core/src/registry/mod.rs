mod directory;
mod servers;

pub use directory::{RegistryDirectory, RegistryEndpoint, SERVICE_TIERS};
pub use servers::{DEFAULT_RDAP_SERVER, FALLBACK_RDAP_SERVERS, RDAP_SERVERS};

mod executor;
mod progress;

pub use executor::{parse_domains_from_file, BatchEnricher, BatchOptions, EnrichmentReport};
pub use progress::{ProgressCallback, ProgressSnapshot, ProgressTracker};

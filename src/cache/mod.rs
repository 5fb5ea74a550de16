mod extraction_cache;

pub use extraction_cache::{fingerprint, ExtractionCache};

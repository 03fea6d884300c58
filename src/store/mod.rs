//! Content-addressed image cache.
//!
//! Encoded images are stored under the SHA-256 of their bytes, which gives
//! deduplication for free: rendering the same text twice yields the same
//! bytes, the same digest and the same file.
//!
//! - [`ContentDigest`]: hex SHA-256 used as key and file stem
//! - [`ContentStore`]: write-once filesystem store with per-digest locking
//!   and atomic publish

mod content_store;
mod digest;

pub use content_store::{ContentStore, StoreOutcome, StoreStats};
pub use digest::{ContentDigest, InvalidDigest, DIGEST_HEX_LEN};

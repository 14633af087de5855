//! JSON-file roster persistence.
//!
//! The roster is kept as one pretty-printed JSON document
//! (`{ "doctors": [...], "ots": [...] }`). Writes go to a sibling `.tmp`
//! file which is then renamed over the target, so a crash mid-write leaves
//! the previous roster readable.

mod storage;

pub use storage::JsonFilePersistence;

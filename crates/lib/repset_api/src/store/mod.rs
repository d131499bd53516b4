//! Production storage backends.

pub mod fs;
pub mod pg;

pub use fs::FsBlobStore;
pub use pg::{PgAccountStore, PgProfileStore};

pub mod enricher;
pub mod incremental;
pub mod loader;
pub mod providers;
pub mod retry;
pub mod writer;

pub use enricher::Enricher;
pub use loader::load_table;
pub use providers::{MovieDatabase, TmdbProvider};
pub use retry::RetryPolicy;
pub use writer::write_table;

//! Pipeline entry points for watcher operations.
//!
//! - `run_batch`: one fetch -> deduplicate -> notify pass over all queries
//! - `run_watch`: `run_batch` on a fixed interval, forever

pub mod normalize;
pub mod paginate;
pub mod run;

pub use normalize::normalize;
pub use paginate::run_query;
pub use run::{run_batch, run_queries, run_watch};

pub mod executor;
pub mod params;
pub mod results;

pub use executor::QueryExecutor;
pub use params::{QueryFlags, SearchParams};
pub use results::{FileMatches, LineMatch, SearchResult, Suggestion};

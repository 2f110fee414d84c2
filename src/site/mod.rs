//! Site page fetching: value types and the network source.

mod source;
mod types;

pub use source::{HttpSource, PageSource};
pub use types::{FetchSource, FetchedPage, PageResponse};

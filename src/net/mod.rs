//! Network access for asset downloads

pub mod fetch;

pub use fetch::{file_name, FetchError, Fetcher, HttpFetcher, USER_AGENT};

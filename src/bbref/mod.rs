// src/bbref/mod.rs
pub mod client;
pub mod models;

#[allow(unused_imports)]
pub use client::{Fetcher, HttpFetcher};
#[allow(unused_imports)]
pub use models::{build_url, StatRequest, StatType, DEFAULT_BASE_URL};

// src/fetch/mod.rs
// =============================================================================
// This module contains everything that talks to the network.
//
// Submodules:
// - http: fetches one page (direct or through the proxy)
// - proxy: SOCKS endpoint helpers and the startup probe
// =============================================================================

mod http;
pub mod proxy;

pub use http::{FetchError, FetchedPage, Fetcher};

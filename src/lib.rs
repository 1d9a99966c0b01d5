// orca-query: Orca Security API query client
// Exposes the query, authentication and flattening logic used by the binaries

pub mod auth;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod flatten;
pub mod http;
pub mod sanitize;
pub mod validation;

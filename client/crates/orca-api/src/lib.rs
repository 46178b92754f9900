//! orca-api
//!
//! HTTP client for the Orca server's REST API: configuration loading and
//! workflow, method, labware and location queries.

pub(crate) mod client;


pub use client::{ClientError, ClientResult, OrcaClient, RecipeMap};

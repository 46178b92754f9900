pub(crate) mod client;
pub(crate) mod error;

pub use client::{OrcaClient, RecipeMap};
pub use error::{ClientError, Result as ClientResult};

//! Service crate for the repository newsletter: concrete clients for every
//! collaborator the pipeline in `newsletter-core` talks to, configuration
//! loading, the webhook server and the CLI.

pub mod cli;
pub mod gemini;
pub mod load_config;
pub mod mermaid_ink;
pub mod notion;
pub mod server;
pub mod upload;

pub use cli::{run, Cli, Commands};

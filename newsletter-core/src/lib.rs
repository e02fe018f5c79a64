#![doc = "newsletter-core: pipeline logic for turning a GitHub repository into a published newsletter article."]

//! This crate holds the job pipeline and the traits for every remote
//! collaborator it uses. Concrete service clients live in the `newsletter`
//! crate.
//!
//! # Usage
//! Build a [`synchronise::Collaborators`] from implementations of the
//! [`contract`] traits and hand jobs to [`synchronise::spawn_job`].

pub mod article;
pub mod blocks;
pub mod config;
pub mod contract;
pub mod diagram;
pub mod download;
pub mod error;
pub mod preprocess;
pub mod prompts;
pub mod publish;
pub mod synchronise;

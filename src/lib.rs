//! Newsroom - admin service for news articles and venues
//!
//! This library provides the wizard sessions, staged-image handling and list
//! views behind the Newsroom admin console. Content itself lives behind a
//! remote GraphQL API.

pub mod api;
pub mod config;
pub mod gateway;
pub mod listing;
pub mod models;
pub mod staging;
pub mod validation;
pub mod wizard;

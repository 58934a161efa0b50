//! CRM and HR record-keeping server: REST API over a relational store, a
//! typed client for it and a development relay for the browser frontend.

pub mod api;
pub mod api_router;
pub mod auth;
pub mod client;
pub mod contacts;
pub mod core;
pub mod dashboards;
pub mod directory;
pub mod main_module;
pub mod people;
pub mod project;
pub mod security;
pub mod web_server;

pub use crate::core::config::{AppConfig, FrontendMode};
pub use crate::core::shared::state::AppState;

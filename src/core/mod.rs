//! Core functionality for document storage, drafts, settings, and configuration

pub mod config;
pub mod document;
pub mod drafts;
pub mod error;
pub mod session;
pub mod settings;
pub mod store;

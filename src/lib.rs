//! Schema migration engine for the VPC control plane database.
//!
//! Migrations are compiled into the binary, loaded into a [`migration::Catalog`]
//! and applied by an [`engine::Migrator`] through any
//! [`db::DatabaseConnection`].

pub mod assets;
pub mod commands;
pub mod config;
pub mod constants;
pub mod db;
pub mod engine;
pub mod error;
pub mod migration;
pub mod progress;
pub mod version_store;

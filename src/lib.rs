//! Section content backend for the food-photography marketing site.
//!
//! ARCHITECTURE
//! ============
//! - `cards`: typed content cards and the shared `SectionConfig` shape.
//! - `store`: per-section config stores (cache, validation, normalization).
//! - `remote`: adapters for the shared `site_configs` table.
//! - `routes`: HTTP surface used by the site and the admin editor.
//! - `state` / `config`: composition root and environment configuration.

pub mod cards;
pub mod config;
pub mod db;
pub mod remote;
pub mod routes;
pub mod state;
pub mod store;

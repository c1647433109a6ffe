//! Remote plugin catalog: HTTP client and page controller.
//!
//! The catalog service owns the authoritative list of field plugins. This
//! crate talks to it through the [`CatalogApi`] trait (implemented over
//! reqwest by [`CatalogClient`]) and keeps a paged view of it in
//! [`PluginCatalogController`].

pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod types;

pub use client::{CatalogApi, CatalogClient};
pub use config::CatalogConfig;
pub use controller::{CatalogViewState, Pagination, PluginCatalogController};
pub use error::{CatalogError, Result};
pub use types::{
    ListQuery, PluginPage, PluginRegisterDto, ProcessDirection, ProcessRequest, ProcessResponse,
    ValidateRequest,
};

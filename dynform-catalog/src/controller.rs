//! PluginCatalogController: paged view-model over the remote catalog.
//!
//! Owns the plugin list, pagination, search form, loading flag, last error and
//! the currently selected plugin. Every operation returns a
//! `Result<_, CatalogError>` and also records the failure message in the view
//! state; the next successful call clears it.
//!
//! List and detail fetches are fenced: each request takes a sequence number and
//! a response is applied only if no newer request of the same kind has been
//! issued since. Stale responses are dropped.

use std::sync::atomic::{AtomicU64, Ordering};

use dynform_fields::{PluginDescriptor, PluginRegistry};
use indexmap::IndexMap;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::client::{CatalogApi, CatalogClient};
use crate::config::CatalogConfig;
use crate::error::Result;
use crate::types::{ListQuery, PluginRegisterDto};

/// Page cursor and the server's total record count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub current: u32,
    pub size: u32,
    pub total: u64,
}

/// Snapshot of everything a catalog page renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogViewState {
    pub plugins: Vec<PluginDescriptor>,
    pub pagination: Pagination,
    pub search_form: IndexMap<String, String>,
    pub loading: bool,
    pub error: Option<String>,
    pub current_plugin: Option<PluginDescriptor>,
}

impl CatalogViewState {
    fn new(page_size: u32) -> Self {
        Self {
            plugins: Vec::new(),
            pagination: Pagination {
                current: 1,
                size: page_size,
                total: 0,
            },
            search_form: IndexMap::new(),
            loading: false,
            error: None,
            current_plugin: None,
        }
    }
}

/// View-model for the plugin catalog page, generic over the catalog API.
pub struct PluginCatalogController<A> {
    api: A,
    state: RwLock<CatalogViewState>,
    list_seq: AtomicU64,
    detail_seq: AtomicU64,
}

impl PluginCatalogController<CatalogClient> {
    /// Controller over a reqwest client built from `config`.
    pub fn from_config(config: &CatalogConfig) -> Result<Self> {
        Ok(Self::new(CatalogClient::from_config(config)?, config.page_size))
    }
}

impl<A: CatalogApi> PluginCatalogController<A> {
    pub fn new(api: A, page_size: u32) -> Self {
        Self {
            api,
            state: RwLock::new(CatalogViewState::new(page_size)),
            list_seq: AtomicU64::new(0),
            detail_seq: AtomicU64::new(0),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Snapshot of the current view state.
    pub async fn state(&self) -> CatalogViewState {
        self.state.read().await.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.loading
    }

    /// Fetch the current page with the current search form.
    ///
    /// On failure the plugin list is emptied. A response overtaken by a newer
    /// fetch leaves the state alone but its outcome is still returned.
    pub async fn fetch_plugins(&self) -> Result<()> {
        let seq = self.list_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let query = {
            let mut state = self.state.write().await;
            state.loading = true;
            ListQuery {
                current: state.pagination.current,
                size: state.pagination.size,
                filters: state.search_form.clone(),
            }
        };
        debug!(seq, current = query.current, size = query.size, "fetching plugins");

        let response = self.api.list_plugins(&query).await;

        let mut state = self.state.write().await;
        if seq != self.list_seq.load(Ordering::SeqCst) {
            debug!(seq, "discarding stale plugin list response");
            return response.map(|_| ());
        }
        state.loading = false;
        match response {
            Ok(page) => {
                let (records, total) = page.into_parts();
                debug!(seq, count = records.len(), total, "plugin list updated");
                state.plugins = records;
                state.pagination.total = total;
                state.error = None;
                Ok(())
            }
            Err(e) => {
                warn!(seq, error = %e, "plugin list fetch failed");
                state.error = Some(e.to_string());
                state.plugins.clear();
                Err(e)
            }
        }
    }

    /// Move to `page` (and optionally a new page size), then refetch.
    pub async fn change_page(&self, page: u32, size: Option<u32>) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state.pagination.current = page;
            if let Some(size) = size {
                state.pagination.size = size;
            }
        }
        self.fetch_plugins().await
    }

    /// Replace the search form, go back to page 1, refetch.
    pub async fn change_search(&self, search_form: IndexMap<String, String>) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state.search_form = search_form;
            state.pagination.current = 1;
        }
        self.fetch_plugins().await
    }

    /// Clear the search form, go back to page 1, refetch.
    pub async fn reset_search(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state.search_form.clear();
            state.pagination.current = 1;
        }
        self.fetch_plugins().await
    }

    /// Fetch one plugin and select it. On failure the selection is kept.
    pub async fn fetch_plugin_detail(&self, type_: &str) -> Result<PluginDescriptor> {
        let seq = self.detail_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let response = self.api.get_plugin(type_).await;

        let mut state = self.state.write().await;
        if seq != self.detail_seq.load(Ordering::SeqCst) {
            debug!(seq, plugin = type_, "discarding stale plugin detail response");
            return response;
        }
        match response {
            Ok(plugin) => {
                state.current_plugin = Some(plugin.clone());
                state.error = None;
                Ok(plugin)
            }
            Err(e) => {
                warn!(plugin = type_, error = %e, "plugin detail fetch failed");
                state.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Register a plugin, then refresh the list.
    pub async fn register_new_plugin(&self, plugin: PluginRegisterDto) -> Result<()> {
        let outcome = self.api.register_plugin(&plugin).await;
        self.after_mutation("register", &plugin.type_, outcome).await
    }

    /// Unregister a plugin, then refresh the list.
    pub async fn unregister_by_type(&self, type_: &str) -> Result<()> {
        let outcome = self.api.unregister_plugin(type_).await;
        self.after_mutation("unregister", type_, outcome).await
    }

    /// Rebuild a local registry from the plugins on the current page.
    pub async fn sync_registry(&self, registry: &mut PluginRegistry) {
        let state = self.state.read().await;
        registry.rebuild(state.plugins.iter().cloned());
    }

    async fn after_mutation(&self, action: &str, type_: &str, outcome: Result<()>) -> Result<()> {
        if let Err(e) = outcome {
            warn!(action, plugin = type_, error = %e, "catalog mutation failed");
            self.state.write().await.error = Some(e.to_string());
            return Err(e);
        }

        self.state.write().await.error = None;
        debug!(action, plugin = type_, "catalog mutation succeeded");
        // The mutation itself went through; a failed refresh is recorded in the state.
        if let Err(e) = self.fetch_plugins().await {
            debug!(action, error = %e, "refresh after mutation failed");
        }
        Ok(())
    }
}

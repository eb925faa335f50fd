//! Discovery of inspectable apps through the dev server's `/json/list`.
//!
//! The dev server lists every JavaScript runtime it knows about, oldest
//! first. Only pages advertising `reactNative.capabilities.nativePageReloads`
//! can take part in plugin broadcasts; everything else (legacy pages, web
//! workers) is filtered out. The list is reversed so the newest runtime
//! comes first.

use std::time::Duration;

use serde_json::Value;

use dtb_core::prelude::*;
use dtb_core::AppDescriptor;

/// Path of the inspector page listing on the dev server.
pub const JSON_LIST_PATH: &str = "/json/list";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Source of the apps currently connected to a dev server.
#[trait_variant::make(AppSource: Send)]
pub trait LocalAppSource {
    /// Query the apps connected to the dev server at `metro_server_origin`.
    async fn query_apps(&self, metro_server_origin: &str) -> Result<Vec<AppDescriptor>>;
}

/// Full `/json/list` URL for `origin`. A trailing `/` on the origin is
/// tolerated.
pub fn json_list_url(origin: &str) -> String {
    format!("{}{}", origin.trim_end_matches('/'), JSON_LIST_PATH)
}

/// Reverse `pages` and keep the ones that support native page reloads.
///
/// Entries that do not describe a page at all are skipped.
pub fn filter_supported_pages(pages: Vec<Value>) -> Vec<AppDescriptor> {
    pages
        .into_iter()
        .rev()
        .filter_map(|page| match serde_json::from_value::<AppDescriptor>(page) {
            Ok(app) => Some(app),
            Err(e) => {
                debug!("discovery: skipping unparsable page: {}", e);
                None
            }
        })
        .filter(AppDescriptor::supports_native_page_reloads)
        .collect()
}

// ---------------------------------------------------------------------------
// InspectorClient
// ---------------------------------------------------------------------------

/// [`AppSource`] backed by HTTP requests to the dev server.
#[derive(Debug, Clone)]
pub struct InspectorClient {
    http: reqwest::Client,
}

impl InspectorClient {
    /// # Errors
    ///
    /// [`Error::Discovery`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::discovery(format!("failed to build http client: {e}")))?;
        Ok(Self { http })
    }

    /// Use a preconfigured client.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl AppSource for InspectorClient {
    async fn query_apps(&self, metro_server_origin: &str) -> Result<Vec<AppDescriptor>> {
        let url = json_list_url(metro_server_origin);
        debug!("discovery: GET {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::discovery(format!("failed to reach {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::discovery(format!("{url} returned HTTP {status}")));
        }

        let pages: Vec<Value> = response
            .json()
            .await
            .map_err(|e| Error::discovery(format!("invalid page list from {url}: {e}")))?;

        let total = pages.len();
        let apps = filter_supported_pages(pages);
        info!(
            "Discovered {} supported app(s) out of {} page(s) at {}",
            apps.len(),
            total,
            metro_server_origin
        );
        Ok(apps)
    }
}

// ---------------------------------------------------------------------------
// StaticAppSource
// ---------------------------------------------------------------------------

/// [`AppSource`] returning a fixed list regardless of origin.
#[derive(Debug, Clone, Default)]
pub struct StaticAppSource {
    apps: Vec<AppDescriptor>,
}

impl StaticAppSource {
    pub fn new(apps: Vec<AppDescriptor>) -> Self {
        Self { apps }
    }
}

impl AppSource for StaticAppSource {
    async fn query_apps(&self, _metro_server_origin: &str) -> Result<Vec<AppDescriptor>> {
        Ok(self.apps.clone())
    }
}

//! Remote template gateway.
//!
//! A stateless-from-the-caller's-view HTTP client that walks an ordered
//! list of candidate base URLs. Per-candidate failures (timeouts, connect
//! errors, non-2xx statuses, malformed bodies) are absorbed here and the
//! next candidate is tried; only exhaustion of the whole list surfaces,
//! as `GatewayError::AllEndpointsFailed`. The coordinator and cache never
//! see raw network errors.

use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::models::{
    LatestEnvelope, ListEnvelope, ReligionFilter, Scope, SingleEnvelope, TemplateRecord,
};

use super::GatewayError;

/// Server-side cap on the batch `limit` parameter.
const MAX_BATCH_LIMIT: u32 = 100;

/// Ordering of a windowed batch fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOrder {
    Ascending,
    Descending,
}

impl FetchOrder {
    fn as_param(self) -> &'static str {
        match self {
            FetchOrder::Ascending => "asc",
            FetchOrder::Descending => "desc",
        }
    }
}

/// Fetch operations the coordinator and index depend on.
///
/// The trait seam exists so the engine can be exercised against an
/// in-memory gateway in tests; `HttpTemplateGateway` is the production
/// implementation.
#[async_trait]
pub trait TemplateGateway: Send + Sync {
    /// Full unsorted record list for a scope. Used to build the serial
    /// index; an empty list is a valid answer ("no templates").
    async fn fetch_category_list(&self, scope: &Scope)
        -> Result<Vec<TemplateRecord>, GatewayError>;

    /// Windowed batch fetch: up to `limit` records with
    /// `serial_no >= start_serial` in the given order.
    async fn fetch_batch(
        &self,
        scope: &Scope,
        start_serial: u32,
        limit: u32,
        order: FetchOrder,
    ) -> Result<Vec<TemplateRecord>, GatewayError>;

    /// Direct single-record lookup by serial, with legacy fallbacks.
    async fn fetch_by_serial(
        &self,
        category: &str,
        serial: u32,
    ) -> Result<Option<TemplateRecord>, GatewayError>;

    /// Most recently uploaded template for a category.
    async fn fetch_latest(&self, category: &str) -> Result<Option<TemplateRecord>, GatewayError>;

    /// Most recently uploaded template for a (religion, category) pair.
    async fn fetch_latest_scoped(
        &self,
        religion: &str,
        category: &str,
    ) -> Result<Option<TemplateRecord>, GatewayError>;
}

/// HTTP implementation of [`TemplateGateway`] backed by `reqwest`.
///
/// Clone-free by design: the engine holds it behind an `Arc`. The one
/// piece of interior state is the sticky "last base URL that answered",
/// tried first on subsequent requests.
pub struct HttpTemplateGateway {
    client: Client,
    candidates: Vec<String>,
    preferred: Mutex<Option<String>>,
}

impl HttpTemplateGateway {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self {
            client,
            candidates: config.candidates(),
            preferred: Mutex::new(None),
        })
    }

    /// Candidate bases in probe order: the last one that answered first,
    /// then the configured list.
    fn candidate_order(&self) -> Vec<String> {
        let preferred = self
            .preferred
            .lock()
            .ok()
            .and_then(|guard| guard.clone());

        let mut order = Vec::with_capacity(self.candidates.len() + 1);
        if let Some(base) = preferred {
            order.push(base);
        }
        for candidate in &self.candidates {
            if !order.contains(candidate) {
                order.push(candidate.clone());
            }
        }
        order
    }

    fn remember(&self, base: &str) {
        if let Ok(mut guard) = self.preferred.lock() {
            *guard = Some(base.to_string());
        }
    }

    /// Issue one GET and parse the body. Any failure maps into the
    /// gateway taxonomy for the caller to absorb.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, GatewayError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .header("Cache-Control", "no-store")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::from_status(status, &body));
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| GatewayError::MalformedResponse(e.to_string()))
    }

    /// List templates from one candidate, preferring the religion +
    /// subcategory API and falling back to the legacy category-only one.
    async fn list_from_candidate(
        &self,
        base: &str,
        scope: &Scope,
    ) -> Result<Vec<TemplateRecord>, GatewayError> {
        let url = format!("{}/api/templates", base);

        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(csv) = scope.religions.query_value() {
            query.push(("religion", csv));
        }
        query.push(("subcategory", scope.category.clone()));

        match self.get_json::<ListEnvelope>(&url, &query).await {
            Ok(envelope) => Ok(Self::collect(envelope.data.templates)),
            Err(e) => {
                debug!(base, error = %e, "subcategory API failed, trying legacy category API");
                let legacy = [("category", scope.category.clone())];
                let envelope: ListEnvelope = self.get_json(&url, &legacy).await?;
                Ok(Self::collect(envelope.data.templates))
            }
        }
    }

    fn collect(raw: Vec<crate::models::RawTemplate>) -> Vec<TemplateRecord> {
        raw.into_iter().filter_map(|t| t.normalize()).collect()
    }

    async fn latest_from_path(&self, path: &str) -> Result<Option<TemplateRecord>, GatewayError> {
        for base in self.candidate_order() {
            let url = format!("{}{}", base, path);
            match self.get_json::<LatestEnvelope>(&url, &[]).await {
                Ok(envelope) => {
                    self.remember(&base);
                    return Ok(envelope.data.template.and_then(|t| t.normalize()));
                }
                Err(e) => {
                    warn!(base = %base, error = %e, "latest-template candidate failed");
                }
            }
        }
        Err(GatewayError::AllEndpointsFailed)
    }
}

#[async_trait]
impl TemplateGateway for HttpTemplateGateway {
    async fn fetch_category_list(
        &self,
        scope: &Scope,
    ) -> Result<Vec<TemplateRecord>, GatewayError> {
        for base in self.candidate_order() {
            match self.list_from_candidate(&base, scope).await {
                Ok(records) => {
                    debug!(base = %base, count = records.len(), "category list fetched");
                    self.remember(&base);
                    return Ok(records);
                }
                Err(e) => {
                    warn!(base = %base, error = %e, "category list candidate failed");
                }
            }
        }
        Err(GatewayError::AllEndpointsFailed)
    }

    async fn fetch_batch(
        &self,
        scope: &Scope,
        start_serial: u32,
        limit: u32,
        order: FetchOrder,
    ) -> Result<Vec<TemplateRecord>, GatewayError> {
        let start_serial = start_serial.max(1);
        let limit = limit.clamp(1, MAX_BATCH_LIMIT);

        for base in self.candidate_order() {
            let url = format!("{}/api/templates", base);

            let mut query: Vec<(&str, String)> = Vec::new();
            if let Some(csv) = scope.religions.query_value() {
                query.push(("religion", csv));
            }
            query.push(("subcategory", scope.category.clone()));
            query.push(("start_serial", start_serial.to_string()));
            query.push(("limit", limit.to_string()));
            query.push(("order", order.as_param().to_string()));

            match self.get_json::<ListEnvelope>(&url, &query).await {
                Ok(envelope) if envelope.success => {
                    debug!(
                        base = %base,
                        start_serial,
                        limit,
                        received = envelope.data.templates.len(),
                        "batch fetched"
                    );
                    self.remember(&base);
                    return Ok(Self::collect(envelope.data.templates));
                }
                Ok(_) => {
                    warn!(base = %base, "batch response missing success flag");
                }
                Err(e) => {
                    warn!(base = %base, error = %e, "batch candidate failed");
                }
            }
        }
        Err(GatewayError::AllEndpointsFailed)
    }

    async fn fetch_by_serial(
        &self,
        category: &str,
        serial: u32,
    ) -> Result<Option<TemplateRecord>, GatewayError> {
        // Preferred path: fetch the whole category and select by serial.
        // Falls back to the lowest serial when there is no exact match,
        // so callers always land on a renderable record.
        let scope = Scope::new(category, ReligionFilter::All);
        let mut any_response = false;

        match self.fetch_category_list(&scope).await {
            Ok(list) if !list.is_empty() => {
                let found = list.iter().find(|r| r.serial_no == serial).cloned();
                let fallback = list.into_iter().min_by_key(|r| r.serial_no);
                return Ok(found.or(fallback));
            }
            Ok(_) => any_response = true,
            Err(_) => {}
        }

        // Legacy by-serial endpoint.
        for base in self.candidate_order() {
            let url = format!("{}/api/templates/by-serial/{}/{}", base, scope.category, serial);
            match self.get_json::<SingleEnvelope>(&url, &[]).await {
                Ok(envelope) => {
                    self.remember(&base);
                    return Ok(envelope.data.and_then(|t| t.normalize()));
                }
                Err(e) => {
                    warn!(base = %base, serial, error = %e, "by-serial candidate failed");
                }
            }
        }

        if any_response {
            Ok(None)
        } else {
            Err(GatewayError::AllEndpointsFailed)
        }
    }

    async fn fetch_latest(&self, category: &str) -> Result<Option<TemplateRecord>, GatewayError> {
        let category = category.trim().to_lowercase();
        self.latest_from_path(&format!("/api/templates/latest/{}", category))
            .await
    }

    async fn fetch_latest_scoped(
        &self,
        religion: &str,
        category: &str,
    ) -> Result<Option<TemplateRecord>, GatewayError> {
        let religion = religion.trim().to_lowercase();
        let category = category.trim().to_lowercase();
        self.latest_from_path(&format!("/api/templates/latest/{}/{}", religion, category))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> HttpTemplateGateway {
        let config = EngineConfig {
            dev_url: Some("http://localhost:10000".to_string()),
            production_url: Some("http://prod.example.com".to_string()),
            use_production_fallback: true,
            ..Default::default()
        };
        HttpTemplateGateway::new(&config).expect("client should build")
    }

    #[test]
    fn preferred_base_moves_to_front() {
        let gw = gateway();
        let initial = gw.candidate_order();
        assert_eq!(initial.first().map(String::as_str), Some("http://localhost:10000"));

        gw.remember("http://prod.example.com");
        let reordered = gw.candidate_order();
        assert_eq!(
            reordered.first().map(String::as_str),
            Some("http://prod.example.com")
        );
        // No duplicates once the preferred base is also a candidate.
        assert_eq!(
            reordered.iter().filter(|b| *b == "http://prod.example.com").count(),
            1
        );
    }

    #[test]
    fn order_param_values() {
        assert_eq!(FetchOrder::Ascending.as_param(), "asc");
        assert_eq!(FetchOrder::Descending.as_param(), "desc");
    }
}

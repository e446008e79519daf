use super::util::{http_client, with_retry};
use crate::core::cache::KeyValueCollection;
use crate::core::taxonomy::{SectorTaxonomy, TaxonomySource};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Downloads a sector classification table published as CSV.
///
/// Bodies that parse into a usable taxonomy are cached under the table URL
/// so a run inside the TTL does not hit the network again. Anything else is
/// returned uncached and the next run retries the remote.
pub struct CsvTaxonomyProvider {
    url: String,
    symbol_suffix: Option<String>,
    cache: Arc<dyn KeyValueCollection>,
    ttl: Duration,
}

impl CsvTaxonomyProvider {
    pub fn new(
        url: &str,
        symbol_suffix: Option<String>,
        cache: Arc<dyn KeyValueCollection>,
        ttl: Duration,
    ) -> Self {
        CsvTaxonomyProvider {
            url: url.to_string(),
            symbol_suffix,
            cache,
            ttl,
        }
    }
}

#[async_trait]
impl TaxonomySource for CsvTaxonomyProvider {
    #[instrument(name = "TaxonomyFetch", skip(self), fields(url = %self.url))]
    async fn fetch_table(&self) -> Result<String> {
        if let Some(cached) = self.cache.get(self.url.as_bytes()).await {
            debug!("Using cached taxonomy table");
            return String::from_utf8(cached).context("Cached taxonomy table is not UTF-8");
        }

        let client = http_client()?;
        let response = with_retry(|| client.get(&self.url).send(), 2, 500)
            .await
            .with_context(|| format!("Request error for taxonomy table {}", self.url))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for taxonomy table {}",
                response.status(),
                self.url
            ));
        }

        let body = response.text().await?;
        if let Err(e) = SectorTaxonomy::from_csv(&body, self.symbol_suffix()) {
            debug!("Not caching unusable taxonomy table: {e:#}");
            return Ok(body);
        }
        self.cache
            .put(self.url.as_bytes(), body.as_bytes(), Some(self.ttl))
            .await;
        Ok(body)
    }

    fn symbol_suffix(&self) -> Option<&str> {
        self.symbol_suffix.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::taxonomy::resolve_taxonomy;
    use crate::store::memory::MemoryCollection;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TABLE: &str = "\
Company Name,Industry,Symbol,Series,ISIN Code
Tata Consultancy Services Ltd.,Information Technology,TCS,EQ,INE467B01029
Infosys Ltd.,Information Technology,INFY,EQ,INE009A01021
HDFC Bank Ltd.,Financial Services,HDFCBANK,EQ,INE040A01034
";

    fn provider(server: &MockServer) -> CsvTaxonomyProvider {
        CsvTaxonomyProvider::new(
            &format!("{}/ind_nifty100list.csv", server.uri()),
            Some(".NS".to_string()),
            Arc::new(MemoryCollection::new()),
            Duration::from_secs(3600),
        )
    }

    #[tokio::test]
    async fn test_discovers_sectors_from_remote_table() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ind_nifty100list.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_string(TABLE))
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server);
        let resolved = resolve_taxonomy(Some(&provider)).await;

        assert!(!resolved.is_fallback());
        assert_eq!(
            resolved.taxonomy().symbols("Information Technology"),
            Some(&["TCS.NS".to_string(), "INFY.NS".to_string()][..])
        );
    }

    #[tokio::test]
    async fn test_server_error_falls_back() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server);
        let err = provider.fetch_table().await.unwrap_err();
        assert!(err.to_string().contains("HTTP error: 500"));

        let resolved = resolve_taxonomy(Some(&provider)).await;
        assert!(resolved.is_fallback());
    }

    #[tokio::test]
    async fn test_table_is_cached_between_fetches() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ind_nifty100list.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_string(TABLE))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server);
        assert_eq!(provider.fetch_table().await.unwrap(), TABLE);
        assert_eq!(provider.fetch_table().await.unwrap(), TABLE);
    }

    #[tokio::test]
    async fn test_unusable_table_is_not_cached() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ind_nifty100list.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>rate limited</html>"))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/ind_nifty100list.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_string(TABLE))
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server);
        assert!(resolve_taxonomy(Some(&provider)).await.is_fallback());

        let resolved = resolve_taxonomy(Some(&provider)).await;
        assert!(!resolved.is_fallback());
        assert!(resolved.taxonomy().symbols("financial services").is_some());
        assert_eq!(mock_server.received_requests().await.map(|r| r.len()), Some(2));
    }
}

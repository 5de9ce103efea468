//! HTTP client for the reconciliation and extension backend.
//!
//! This is the transport boundary: it lists the service catalogs and posts
//! request bodies built elsewhere, returning decoded responses. It never
//! retries; a failed call is reported to the caller as-is.

use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use semtab_shared::{
    ExtensionRequest, ExtensionResponse, ReconciliationEntry, ReconciliationRequest, Result,
    SemtabError, ServiceConfig, ServiceDescriptor,
};

/// User-Agent string for service requests.
const USER_AGENT: &str = concat!("semtab/", env!("CARGO_PKG_VERSION"));

/// Handle on one backend, built from a [`ServiceConfig`].
#[derive(Debug, Clone)]
pub struct ServiceClient {
    client: Client,
    api_root: String,
    token: Option<String>,
}

impl ServiceClient {
    /// Build a client with the configured timeout and bearer token.
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let api_root = config.api_root()?.to_string();
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SemtabError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_root,
            token: config.token.clone(),
        })
    }

    /// `GET reconciliators/list`.
    #[instrument(skip_all)]
    pub async fn reconciliators(&self) -> Result<Vec<ServiceDescriptor>> {
        let services: Vec<ServiceDescriptor> =
            self.get_json(&self.endpoint("reconciliators", "list")).await?;
        debug!(count = services.len(), "reconciliator catalog fetched");
        Ok(services)
    }

    /// `GET extenders/list`.
    #[instrument(skip_all)]
    pub async fn extenders(&self) -> Result<Vec<ServiceDescriptor>> {
        let services: Vec<ServiceDescriptor> =
            self.get_json(&self.endpoint("extenders", "list")).await?;
        debug!(count = services.len(), "extender catalog fetched");
        Ok(services)
    }

    /// Post a reconciliation request to `service`.
    #[instrument(skip_all, fields(service = %service.id, items = request.items.len()))]
    pub async fn reconcile(
        &self,
        service: &ServiceDescriptor,
        request: &ReconciliationRequest,
    ) -> Result<Vec<ReconciliationEntry>> {
        let url = self.endpoint("reconciliators", &service.relative_url);
        info!(%url, "sending reconciliation request");
        self.post_json(&url, request).await
    }

    /// Post an extension request to `service`.
    #[instrument(skip_all, fields(service = %service.id))]
    pub async fn extend(
        &self,
        service: &ServiceDescriptor,
        request: &ExtensionRequest,
    ) -> Result<ExtensionResponse> {
        let url = self.endpoint("extenders", &service.relative_url);
        info!(%url, properties = request.property.len(), "sending extension request");
        self.post_json(&url, request).await
    }

    /// `<api root><group>/<relative>` with exactly one slash at the join.
    fn endpoint(&self, group: &str, relative: &str) -> String {
        format!(
            "{}{group}/{}",
            self.api_root,
            relative.trim_start_matches('/')
        )
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let builder = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json");
        self.send(url, self.authorize(builder)).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, url: &str, body: &B) -> Result<T> {
        let builder = self
            .client
            .post(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(body);
        self.send(url, self.authorize(builder)).await
    }

    async fn send<T: DeserializeOwned>(&self, url: &str, builder: RequestBuilder) -> Result<T> {
        let response = builder
            .send()
            .await
            .map_err(|e| SemtabError::Transport(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SemtabError::Transport(format!("{url}: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SemtabError::Transport(format!("{url}: failed to read body: {e}")))?;

        serde_json::from_str(&body)
            .map_err(|e| SemtabError::decode(format!("{url}: unexpected response body: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, token: Option<&str>) -> ServiceClient {
        let config = ServiceConfig {
            base_url: server.uri(),
            token: token.map(String::from),
            timeout_secs: 5,
        };
        ServiceClient::new(&config).expect("client")
    }

    fn geonames() -> ServiceDescriptor {
        ServiceDescriptor {
            id: "geonames".into(),
            name: "GeoNames".into(),
            relative_url: "/geonames".into(),
            uri: Some("http://www.geonames.org/".into()),
            prefix: Some("geo".into()),
        }
    }

    #[test]
    fn endpoint_joins_with_single_slash() {
        let config = ServiceConfig {
            base_url: "http://localhost:3003/".into(),
            token: None,
            timeout_secs: 5,
        };
        let client = ServiceClient::new(&config).unwrap();
        assert_eq!(
            client.endpoint("reconciliators", "/geonames"),
            "http://localhost:3003/api/reconciliators/geonames"
        );
        assert_eq!(
            client.endpoint("extenders", "meteo"),
            "http://localhost:3003/api/extenders/meteo"
        );
    }

    #[tokio::test]
    async fn lists_reconciliators_with_bearer_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/reconciliators/list"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "id": "geonames",
                    "name": "GeoNames",
                    "relativeUrl": "/geonames",
                    "uri": "http://www.geonames.org/",
                    "prefix": "geo",
                    "formParams": []
                },
                { "id": "wikidata", "name": "Wikidata", "relativeUrl": "/wikidata" }
            ])))
            .mount(&server)
            .await;

        let services = client_for(&server, Some("secret"))
            .reconciliators()
            .await
            .unwrap();
        assert_eq!(services.len(), 2);
        assert_eq!(services[0].prefix.as_deref(), Some("geo"));
        assert!(services[1].uri.is_none());
    }

    #[tokio::test]
    async fn posts_reconciliation_body() {
        let server = MockServer::start().await;
        let request = ReconciliationRequest {
            service_id: "geonames".into(),
            items: vec![semtab_shared::ReconciliationItem {
                id: "column$index".into(),
                label: "City".into(),
            }],
        };

        Mock::given(method("POST"))
            .and(path("/api/reconciliators/geonames"))
            .and(body_json(json!({
                "serviceId": "geonames",
                "items": [{ "id": "column$index", "label": "City" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": "column$index", "metadata": [] }
            ])))
            .mount(&server)
            .await;

        let entries = client_for(&server, None)
            .reconcile(&geonames(), &request)
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "column$index");
    }

    #[tokio::test]
    async fn http_error_is_transport_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/extenders/list"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server, None).extenders().await.unwrap_err();
        assert!(matches!(err, SemtabError::Transport(_)));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn malformed_body_is_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/reconciliators/list"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server, None).reconciliators().await.unwrap_err();
        assert!(matches!(err, SemtabError::Decode { .. }));
    }
}

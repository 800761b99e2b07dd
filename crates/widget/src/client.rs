//! HTTP client for the widgetgate API

use std::time::Duration;

use reqwest::{Client, Response};
use serde::Deserialize;
use url::Url;
use widgetgate_shared::{NewEvent, PropertyInfo, ResolutionSource, TenantConfigUpdate};

use crate::{error::ClientError, theme::PartialTheme};

/// Every call gives up after this long unless configured otherwise
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Answer of the domain lookup endpoint. Fields are optional so a partial
/// body still yields something usable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainLookup {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub source: Option<ResolutionSource>,
}

#[derive(Clone)]
pub struct WidgetClient {
    client: Client,
    base_url: Url,
}

impl WidgetClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ClientError::InvalidBaseUrl(base_url.to_string()))?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/api/{segments...}` with each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(ClientError::Status(status.as_u16()))
        }
    }

    /// Ask the server which project serves `host`
    pub async fn resolve_domain(&self, host: &str) -> Result<DomainLookup, ClientError> {
        let url = self.endpoint(&["widget-config", "domain", host])?;
        let response = Self::check(self.client.get(url).send().await?)?;
        Ok(response.json().await?)
    }

    /// Stored theme for a project
    pub async fn fetch_config(&self, project_id: &str) -> Result<PartialTheme, ClientError> {
        let url = self.endpoint(&["widget-config", project_id])?;
        let response = Self::check(self.client.get(url).send().await?)?;
        Ok(response.json().await?)
    }

    /// Save property metadata detected on the page
    pub async fn push_property_info(
        &self,
        project_id: &str,
        property_info: &PropertyInfo,
    ) -> Result<(), ClientError> {
        let url = self.endpoint(&["widget-config", project_id])?;
        let update = TenantConfigUpdate::property_info(property_info.clone());
        Self::check(self.client.post(url).json(&update).send().await?)?;
        Ok(())
    }

    pub async fn post_event(&self, event: &NewEvent) -> Result<(), ClientError> {
        let url = self.endpoint(&["events"])?;
        Self::check(self.client.post(url).json(event).send().await?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn client_for(server: &mockito::Server) -> WidgetClient {
        WidgetClient::new(&server.url(), DEFAULT_REQUEST_TIMEOUT).unwrap()
    }

    #[test]
    fn test_rejects_unusable_base_url() {
        assert!(matches!(
            WidgetClient::new("not a url", DEFAULT_REQUEST_TIMEOUT),
            Err(ClientError::InvalidBaseUrl(_))
        ));
        assert!(matches!(
            WidgetClient::new("mailto:someone@example.com", DEFAULT_REQUEST_TIMEOUT),
            Err(ClientError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn test_endpoint_encodes_segments_and_keeps_base_path() {
        let client =
            WidgetClient::new("https://api.example.com/widget/", DEFAULT_REQUEST_TIMEOUT).unwrap();
        let url = client.endpoint(&["widget-config", "a b/c"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/widget/api/widget-config/a%20b%2Fc"
        );
    }

    #[tokio::test]
    async fn test_resolve_domain() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/widget-config/domain/lodha.com")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"projectId":"5796","domain":"lodha.com","source":"static_map"}"#)
            .create_async()
            .await;

        let lookup = client_for(&server).resolve_domain("lodha.com").await.unwrap();
        assert_eq!(lookup.project_id.as_deref(), Some("5796"));
        assert_eq!(lookup.source, Some(ResolutionSource::StaticMap));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/widget-config/5796")
            .with_status(503)
            .create_async()
            .await;

        let result = client_for(&server).fetch_config("5796").await;
        assert!(matches!(result, Err(ClientError::Status(503))));
    }

    #[tokio::test]
    async fn test_push_property_info_sends_partial_update() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/widget-config/5796")
            .match_body(Matcher::Json(json!({"propertyInfo": {"projectName": "Skyline"}})))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let info = json!({"projectName": "Skyline"}).as_object().cloned().unwrap();
        client_for(&server)
            .push_property_info("5796", &info)
            .await
            .unwrap();
        mock.assert_async().await;
    }
}

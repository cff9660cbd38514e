//! Common utilities for the MAAS API client
//!
//! Provides the authenticated HTTP wrapper shared by every API call.

pub mod oauth;

use crate::error::MaasError;
use oauth::ApiKey;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use tracing::debug;

/// Path prefix of the MAAS 2.0 API below the region URL
const API_PREFIX: &str = "/api/2.0";

/// Build one form field
pub fn field(name: &str, value: &str) -> (String, String) {
    (name.to_string(), value.to_string())
}

/// HTTP client wrapper with OAuth authentication
pub struct HttpClient {
    client: Client,
    base_url: String,
    api_key: ApiKey,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Create a new HTTP client wrapper
    pub fn new(client: Client, base_url: String, api_key: ApiKey) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a full API URL from a path and an optional `op` selector
    pub fn build_url(&self, path: &str, op: Option<&str>) -> String {
        let mut url = format!("{}{}{}", self.base_url, API_PREFIX, path);
        if let Some(op) = op {
            url.push_str("?op=");
            url.push_str(&urlencoding::encode(op));
        }
        url
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("Authorization", self.api_key.authorization_header())
            .header("Accept", "application/json")
    }

    /// Make a GET request
    pub async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        op: Option<&str>,
    ) -> Result<T, MaasError> {
        let url = self.build_url(path, op);
        debug!("GET {}", url);

        let response = self.authorized(self.client.get(&url)).send().await?;
        let response = Self::check_status("GET", path, response).await?;
        Self::decode(path, response).await
    }

    /// Make a form-encoded POST request and decode the response
    pub async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        op: Option<&str>,
        form: &[(String, String)],
    ) -> Result<T, MaasError> {
        let response = self.send_form("POST", path, op, form).await?;
        Self::decode(path, response).await
    }

    /// Make a form-encoded POST request, ignoring the response body
    pub async fn post_discard(
        &self,
        path: &str,
        op: Option<&str>,
        form: &[(String, String)],
    ) -> Result<(), MaasError> {
        self.send_form("POST", path, op, form).await.map(|_| ())
    }

    /// Make a form-encoded PUT request and decode the response
    pub async fn put<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> Result<T, MaasError> {
        let response = self.send_form("PUT", path, None, form).await?;
        Self::decode(path, response).await
    }

    /// Make a form-encoded PUT request, ignoring the response body
    pub async fn put_discard(&self, path: &str, form: &[(String, String)]) -> Result<(), MaasError> {
        self.send_form("PUT", path, None, form).await.map(|_| ())
    }

    async fn send_form(
        &self,
        method: &str,
        path: &str,
        op: Option<&str>,
        form: &[(String, String)],
    ) -> Result<Response, MaasError> {
        let url = self.build_url(path, op);
        // Field values can carry credentials (power_pass), so only names are logged
        debug!(
            "{} {} with fields: {:?}",
            method,
            url,
            form.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>()
        );

        let builder = match method {
            "PUT" => self.client.put(&url),
            _ => self.client.post(&url),
        };
        let response = self.authorized(builder).form(form).send().await?;
        Self::check_status(method, path, response).await
    }

    async fn check_status(method: &str, path: &str, response: Response) -> Result<Response, MaasError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == 401 || status == 403 {
            return Err(MaasError::Authentication(format!(
                "{} {} rejected: {} - {}",
                method, path, status, body
            )));
        }
        if status == 404 {
            return Err(MaasError::NotFound(format!(
                "Resource not found: {} - {}",
                path, body
            )));
        }
        if status == 400 {
            return Err(MaasError::InvalidRequest(format!(
                "{} {} failed: {}",
                method, path, body
            )));
        }
        Err(MaasError::Api(format!(
            "{} {} failed: {} - {}",
            method, path, status, body
        )))
    }

    async fn decode<T: for<'de> Deserialize<'de>>(path: &str, response: Response) -> Result<T, MaasError> {
        let response_text = response.text().await?;
        parse_body(path, &response_text)
    }
}

/// Deserialize a response body, keeping the start of the body for diagnostics
fn parse_body<T: for<'de> Deserialize<'de>>(path: &str, body: &str) -> Result<T, MaasError> {
    serde_json::from_str(body).map_err(|source| MaasError::Decode {
        path: path.to_string(),
        body: body.chars().take(500).collect(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(base_url: &str) -> HttpClient {
        let api_key = ApiKey::parse("ck:tk:ts").unwrap();
        HttpClient::new(Client::new(), base_url.to_string(), api_key)
    }

    #[test]
    fn test_build_url_trims_trailing_slash() {
        let client = http("http://172.27.8.1:5240/MAAS/");
        assert_eq!(client.base_url(), "http://172.27.8.1:5240/MAAS");
        assert_eq!(
            client.build_url("/machines/", None),
            "http://172.27.8.1:5240/MAAS/api/2.0/machines/"
        );
    }

    #[test]
    fn test_build_url_with_op() {
        let client = http("http://172.27.8.1:5240/MAAS");
        assert_eq!(
            client.build_url("/boot-resources/", Some("is_importing")),
            "http://172.27.8.1:5240/MAAS/api/2.0/boot-resources/?op=is_importing"
        );
    }

    #[test]
    fn test_parse_body_keeps_path_and_body_start() {
        let html = format!("<html>{}</html>", "x".repeat(600));
        let err = parse_body::<Vec<u64>>("/zones/", &html).unwrap_err();
        match err {
            MaasError::Decode { path, body, .. } => {
                assert_eq!(path, "/zones/");
                assert_eq!(body.len(), 500);
                assert!(body.starts_with("<html>"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(parse_body::<Vec<u64>>("/zones/", "[1, 2]").unwrap(), vec![1, 2]);
    }
}

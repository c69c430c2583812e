use crate::core::error::AgentError;
use reqwest::multipart::Form;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use std::collections::HashMap;

/// Thin reqwest wrapper shared by the completion, assistant and search clients.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    auth_header: Option<(String, String)>,
    extra_headers: HashMap<String, String>,
    query_params: Vec<(String, String)>,
}

impl HttpClient {
    pub fn new(
        base_url: String,
        auth_header: Option<(String, String)>,
        extra_headers: Option<HashMap<String, String>>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header,
            extra_headers: extra_headers.unwrap_or_default(),
            query_params: Vec::new(),
        }
    }

    /// Adds a query parameter sent with every request (e.g. `api-version`).
    pub fn with_query_param(mut self, key: &str, value: &str) -> Self {
        self.query_params.push((key.to_string(), value.to_string()));
        self
    }

    pub fn url(&self, path: &str) -> String {
        if path.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    fn decorate(&self, mut request: RequestBuilder) -> RequestBuilder {
        if let Some((name, value)) = &self.auth_header {
            request = request.header(name, value);
        }
        for (key, value) in &self.extra_headers {
            request = request.header(key, value);
        }
        if !self.query_params.is_empty() {
            request = request.query(&self.query_params);
        }
        request
    }

    pub async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<Response, AgentError> {
        let request = self.decorate(self.client.post(self.url(path)).json(payload));
        check_status(request.send().await?).await
    }

    pub async fn post_multipart(&self, path: &str, form: Form) -> Result<Response, AgentError> {
        let request = self.decorate(self.client.post(self.url(path)).multipart(form));
        check_status(request.send().await?).await
    }

    pub async fn get(&self, path: &str) -> Result<Response, AgentError> {
        let request = self.decorate(self.client.get(self.url(path)));
        check_status(request.send().await?).await
    }

    pub async fn delete(&self, path: &str) -> Result<Response, AgentError> {
        let request = self.decorate(self.client.delete(self.url(path)));
        check_status(request.send().await?).await
    }
}

/// Turns non-success responses into `AgentError::Api`, keeping the body for diagnostics.
async fn check_status(response: Response) -> Result<Response, AgentError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AgentError::Api(format!("{}: {}", status, body)))
}

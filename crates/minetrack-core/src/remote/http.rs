//! reqwest-backed client for the remote directory and report API.

use serde::de::DeserializeOwned;

use super::error::parse_api_error;
use super::{
    DirectoryPage, DirectorySource, PageRequest, RemoteError, ReportSink, ReportSubmission,
    SubmitResponse,
};
use crate::config::RemoteConfig;
use crate::models::Category;

/// HTTP client for `GET /directory/{category}` and `POST /reports`.
#[derive(Debug, Clone)]
pub struct HttpRemoteClient {
    base_url: String,
    access_token: Option<String>,
    client: reqwest::Client,
}

impl HttpRemoteClient {
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let base_url = crate::config::normalize_base_url(&config.api_base_url)?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|error| {
                RemoteError::InvalidConfiguration(format!(
                    "failed to construct HTTP client: {error}"
                ))
            })?;
        Ok(Self {
            base_url,
            access_token: config.access_token.clone(),
            client,
        })
    }

    /// Returns the base URL this client was configured with.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn directory_url(&self, category: Category, request: &PageRequest) -> String {
        let query = request
            .query_pairs()
            .into_iter()
            .map(|(key, value)| format!("{key}={}", urlencoding::encode(&value)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}/directory/{}?{query}", self.base_url, category.as_str())
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, RemoteError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(parse_api_error(status.as_u16(), &body));
        }
        serde_json::from_str(&body).map_err(|error| RemoteError::InvalidPayload(error.to_string()))
    }
}

impl DirectorySource for HttpRemoteClient {
    async fn fetch_page(
        &self,
        category: Category,
        request: &PageRequest,
    ) -> Result<DirectoryPage, RemoteError> {
        let url = self.directory_url(category, request);
        tracing::debug!(%category, page = request.page, "Fetching directory page");

        let response = self
            .authorize(self.client.get(&url))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        let page: DirectoryPage = Self::read_json(response).await?;
        if !page.success {
            return Err(RemoteError::Api {
                status: 200,
                message: page
                    .message
                    .unwrap_or_else(|| format!("{category} page {} was rejected", request.page)),
            });
        }
        Ok(page)
    }
}

impl ReportSink for HttpRemoteClient {
    async fn submit_report(
        &self,
        submission: &ReportSubmission,
    ) -> Result<SubmitResponse, RemoteError> {
        let response = self
            .authorize(self.client.post(format!("{}/reports", self.base_url)))
            .header(reqwest::header::ACCEPT, "application/json")
            .json(submission)
            .send()
            .await?;
        let reply: SubmitResponse = Self::read_json(response).await?;
        if !reply.success {
            return Err(RemoteError::Api {
                status: 200,
                message: reply
                    .message
                    .unwrap_or_else(|| "report was rejected".to_string()),
            });
        }
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> HttpRemoteClient {
        HttpRemoteClient::new(&RemoteConfig::new(base_url).unwrap()).unwrap()
    }

    #[test]
    fn directory_url_encodes_filters() {
        let request = PageRequest {
            search: Some("gold & silver".to_string()),
            ..PageRequest::new(1, 1000)
        };

        assert_eq!(
            client("https://api.example.com/api/").directory_url(Category::Local, &request),
            "https://api.example.com/api/directory/local?page=1&limit=1000&search=gold%20%26%20silver"
        );
    }

    #[test]
    fn new_rejects_invalid_base_url() {
        let config = RemoteConfig {
            api_base_url: "ftp://example.com".to_string(),
            page_size: 10,
            request_timeout_secs: 5,
            access_token: None,
        };
        assert!(matches!(
            HttpRemoteClient::new(&config),
            Err(RemoteError::InvalidConfiguration(_))
        ));
    }
}

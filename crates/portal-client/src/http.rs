// Shared HTTP plumbing for backend calls: base URL joining, credentials and status checks.
use crate::{ClientConfig, ClientError, ClientResult, Credentials};
use serde::Serialize;
use serde::de::DeserializeOwned;

#[derive(Debug, Clone)]
pub struct PortalHttp {
    base_url: String,
    client: reqwest::Client,
}

impl PortalHttp {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()?;
        Ok(Self::with_client(config.api_url.clone(), client))
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        credentials: Option<&Credentials>,
    ) -> ClientResult<T> {
        let mut request = self.client.get(self.url(path));
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(credentials) = credentials {
            request = credentials.apply(request);
        }
        read_json(request.send().await?, path).await
    }

    pub(crate) async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        credentials: Option<&Credentials>,
    ) -> ClientResult<T> {
        let mut request = self.client.post(self.url(path)).json(body);
        if let Some(credentials) = credentials {
            request = credentials.apply(request);
        }
        read_json(request.send().await?, path).await
    }
}

async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
    endpoint: &str,
) -> ClientResult<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::Status {
            status: status.as_u16(),
            endpoint: endpoint.to_string(),
        });
    }
    Ok(response.json().await?)
}

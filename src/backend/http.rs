//! HTTP client for the article API

use crate::backend::{ArticleUpload, BackendError, BackendResult, ResultSink, TargetSource};
use crate::config::{BackendConfig, UserAgentConfig};
use crate::host::MHTML_CONTENT_TYPE;
use crate::queue::{Target, TargetFilter};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use std::time::Duration;
use url::Url;

/// Article API client implementing both the read and the write path
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    /// Builds a backend client
    ///
    /// # Arguments
    ///
    /// * `config` - Backend location and request timeout
    /// * `user_agent` - Identification sent with every request
    pub fn new(config: &BackendConfig, user_agent: &UserAgentConfig) -> crate::Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent.header_value())
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Self::with_client(client, &config.base_url)
    }

    /// Uses an existing client against `base_url`
    pub fn with_client(client: Client, base_url: &str) -> crate::Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        // Url::join replaces the last segment unless the path ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> BackendResult<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn get_targets(&self, url: Url) -> BackendResult<Vec<Target>> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| BackendError::Http {
                url: url.to_string(),
                source,
            })?;

        let body = check_status(response, &url)?
            .text()
            .await
            .map_err(|source| BackendError::Http {
                url: url.to_string(),
                source,
            })?;

        serde_json::from_str(&body).map_err(|e| BackendError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

fn check_status(response: Response, url: &Url) -> BackendResult<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(BackendError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl TargetSource for HttpBackend {
    async fn fetch_articles(
        &self,
        filter: TargetFilter,
        from: Option<usize>,
        size: Option<usize>,
    ) -> BackendResult<Vec<Target>> {
        let mut url = self.endpoint("articles")?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(status) = filter.query_value() {
                query.append_pair("status", status);
            }
            if let Some(from) = from {
                query.append_pair("from", &from.to_string());
            }
            if let Some(size) = size {
                query.append_pair("size", &size.to_string());
            }
        }
        // An empty query_pairs_mut() still leaves a trailing '?'
        if url.query() == Some("") {
            url.set_query(None);
        }

        self.get_targets(url).await
    }

    async fn fetch_articles_by_id(&self, ids: &[String]) -> BackendResult<Vec<Target>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut url = self.endpoint("article")?;
        url.query_pairs_mut().append_pair("ids", &ids.join(","));

        self.get_targets(url).await
    }
}

#[async_trait]
impl ResultSink for HttpBackend {
    async fn post_article(&self, upload: ArticleUpload) -> BackendResult<()> {
        let url = self.endpoint("article")?;
        let http_err = |source| BackendError::Http {
            url: url.to_string(),
            source,
        };

        let mut form = Form::new()
            .text("id", upload.id.clone())
            .text("metadata", serde_json::to_string(&upload.metadata)?);

        if let Some(snapshot) = upload.snapshot {
            let part = Part::bytes(snapshot)
                .file_name(format!("{}.mhtml", upload.id))
                .mime_str(MHTML_CONTENT_TYPE)
                .map_err(http_err)?;
            form = form.part("snapshot", part);
        }

        if let Some(webpage) = upload.webpage {
            let part = Part::text(serde_json::to_string(&webpage)?)
                .mime_str("application/json")
                .map_err(http_err)?;
            form = form.part("webpage", part);
        }

        tracing::debug!("POST {} (article {})", url, upload.id);
        let response = self
            .client
            .post(url.clone())
            .multipart(form)
            .send()
            .await
            .map_err(http_err)?;

        check_status(response, &url)?;
        Ok(())
    }
}

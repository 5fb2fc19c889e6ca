//! Zoho CRM API client.
//!
//! Every operation maps to exactly one HTTP request against
//! `{base_url}/{module}[/...]`. Responses are returned untouched, whatever
//! their status; only argument validation, token acquisition and transport
//! failures produce errors.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

use crate::auth::{OAuthConfig, TokenManager, TokenProvider};
use crate::error::{Result, ZohoError};
use crate::http_client::{ZohoHttpClient, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS};

/// Body of a PATCH request: `{"data": [fields]}`
#[derive(Serialize)]
struct DataEnvelope<'a, T: ?Sized + Serialize> {
    data: [&'a T; 1],
}

#[derive(Serialize)]
struct AttachmentUrl<'a> {
    #[serde(rename = "attachmentUrl")]
    attachment_url: &'a str,
}

/// Zoho CRM API client.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use zoho_crm::{OAuthConfig, TokenManager, ZohoClient};
///
/// # async fn example() -> zoho_crm::Result<()> {
/// let config = OAuthConfig::new("india", "1000.refresh", "1000.CLIENT", "secret", "refresh_token")?
///     .token_dir("/var/lib/crm");
/// let tokens = Arc::new(TokenManager::new(config)?);
/// let client = ZohoClient::new("https://www.zohoapis.in/crm/v2", tokens)?;
///
/// let response = client.read_record("Leads", "4876876000000624001").await?;
/// println!("{} {}", response.status(), response.text().await?);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ZohoClient {
    http: ZohoHttpClient,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl ZohoClient {
    /// Create a client with default timeouts
    pub fn new(base_url: impl Into<String>, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        let http = ZohoHttpClient::new(DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS)?;
        Ok(Self::with_http_client(base_url, tokens, http))
    }

    pub fn with_http_client(
        base_url: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
        http: ZohoHttpClient,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            tokens,
        }
    }

    /// Build a `TokenManager` from `config` and a client on top of it
    pub fn from_oauth(base_url: impl Into<String>, config: OAuthConfig) -> Result<Self> {
        let tokens = Arc::new(TokenManager::new(config)?);
        Self::new(base_url, tokens)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Current bearer token from the configured provider
    pub async fn access_token(&self) -> Result<String> {
        let token = self.tokens.access_token().await?;
        require(&token, "token")?;
        Ok(token)
    }

    // Basic CRUD operations

    /// POST `/{module}`
    pub async fn create_record<T: Serialize + ?Sized>(&self, module: &str, data: &T) -> Result<Response> {
        let url = self.module_url(module)?;
        tracing::debug!(module, "create_record");
        let token = self.access_token().await?;
        self.send(self.request(Method::POST, &url, &token).json(data)).await
    }

    /// GET `/{module}/{id}`
    pub async fn read_record(&self, module: &str, id: &str) -> Result<Response> {
        let url = self.record_url(module, id)?;
        tracing::debug!(module, id, "read_record");
        let token = self.access_token().await?;
        self.send(self.request(Method::GET, &url, &token)).await
    }

    /// GET `/{module}`
    pub async fn read_records(&self, module: &str) -> Result<Response> {
        let url = self.module_url(module)?;
        tracing::debug!(module, "read_records");
        let token = self.access_token().await?;
        self.send(self.request(Method::GET, &url, &token)).await
    }

    /// Alias of `read_records`
    pub async fn fetch_module_data(&self, module: &str) -> Result<Response> {
        self.read_records(module).await
    }

    /// PUT `/{module}/{id}` with the full record
    pub async fn update_record<T: Serialize + ?Sized>(
        &self,
        module: &str,
        id: &str,
        data: &T,
    ) -> Result<Response> {
        let url = self.record_url(module, id)?;
        tracing::debug!(module, id, "update_record");
        let token = self.access_token().await?;
        self.send(self.request(Method::PUT, &url, &token).json(data)).await
    }

    /// PATCH `/{module}/{id}` with `{"data": [data]}`
    pub async fn patch_record<T: Serialize + ?Sized>(
        &self,
        module: &str,
        id: &str,
        data: &T,
    ) -> Result<Response> {
        let url = self.record_url(module, id)?;
        tracing::debug!(module, id, "patch_record");
        let token = self.access_token().await?;
        let body = DataEnvelope { data: [data] };
        self.send(self.request(Method::PATCH, &url, &token).json(&body))
            .await
    }

    /// DELETE `/{module}/{id}`
    pub async fn delete_record(&self, module: &str, id: &str) -> Result<Response> {
        let url = self.record_url(module, id)?;
        tracing::debug!(module, id, "delete_record");
        let token = self.access_token().await?;
        self.send(self.request(Method::DELETE, &url, &token)).await
    }

    // Attachments and related lists

    /// POST `/{module}/{record_id}/Attachments`
    ///
    /// Uploads the local file as multipart when `file_path` is given,
    /// otherwise posts `{"attachmentUrl": file_url}`. `file_path` wins when
    /// both are present; neither is an `InvalidArgument`.
    pub async fn attach_file(
        &self,
        module: &str,
        record_id: &str,
        file_path: Option<&Path>,
        file_url: Option<&str>,
    ) -> Result<Response> {
        let url = format!("{}/Attachments", self.record_url(module, record_id)?);

        let file_path = file_path.filter(|p| !p.as_os_str().is_empty());
        let file_url = file_url.filter(|u| !u.trim().is_empty());

        if let Some(path) = file_path {
            let form = multipart_file(path).await?;
            tracing::debug!(module, record_id, path = %path.display(), "attach_file (upload)");
            let token = self.access_token().await?;
            return self
                .send(self.authorized(Method::POST, &url, &token).multipart(form))
                .await;
        }

        if let Some(file_url) = file_url {
            tracing::debug!(module, record_id, file_url, "attach_file (url)");
            let token = self.access_token().await?;
            let body = AttachmentUrl {
                attachment_url: file_url,
            };
            return self
                .send(self.request(Method::POST, &url, &token).json(&body))
                .await;
        }

        Err(ZohoError::InvalidArgument(
            "Either file_path or file_url must be provided.".to_string(),
        ))
    }

    /// GET `/{module}/{record_id}/Attachments[/{file_id}]`
    ///
    /// With `fetch_all` the file id is ignored; without it one is required.
    pub async fn fetch_file(
        &self,
        module: &str,
        record_id: &str,
        file_id: Option<&str>,
        fetch_all: bool,
    ) -> Result<Response> {
        let attachments = format!("{}/Attachments", self.record_url(module, record_id)?);

        let url = if fetch_all {
            attachments
        } else {
            let file_id = file_id.unwrap_or_default();
            require(file_id, "file_id").map_err(|_| {
                ZohoError::InvalidArgument(
                    "file_id must be provided when fetch_all is false.".to_string(),
                )
            })?;
            format!("{}/{}", attachments, file_id)
        };

        tracing::debug!(module, record_id, fetch_all, "fetch_file");
        let token = self.access_token().await?;
        self.send(self.request(Method::GET, &url, &token)).await
    }

    /// GET `/{module}/{record_id}/{name}`
    pub async fn fetch_related_list(
        &self,
        module: &str,
        record_id: &str,
        name: &str,
    ) -> Result<Response> {
        let record_url = self.record_url(module, record_id)?;
        require(name, "name")?;
        let url = format!("{}/{}", record_url, name);

        tracing::debug!(module, record_id, name, "fetch_related_list");
        let token = self.access_token().await?;
        self.send(self.request(Method::GET, &url, &token)).await
    }

    // Request plumbing

    fn module_url(&self, module: &str) -> Result<String> {
        require(module, "module")?;
        Ok(format!("{}/{}", self.base_url, module))
    }

    fn record_url(&self, module: &str, id: &str) -> Result<String> {
        let module_url = self.module_url(module)?;
        require(id, "record_id")?;
        Ok(format!("{}/{}", module_url, id))
    }

    /// Request carrying the Zoho authorization header only
    fn authorized(&self, method: Method, url: &str, token: &str) -> RequestBuilder {
        self.http
            .client()
            .request(method, url)
            .header(AUTHORIZATION, format!("Zoho-oauthtoken {}", token))
    }

    /// Authorized JSON request
    fn request(&self, method: Method, url: &str, token: &str) -> RequestBuilder {
        self.authorized(method, url, token)
            .header(CONTENT_TYPE, "application/json")
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let request = builder.build()?;
        self.http.execute(request).await
    }
}

fn require(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ZohoError::required(name));
    }
    Ok(())
}

async fn multipart_file(path: &Path) -> Result<Form> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| ZohoError::AttachmentError {
            path: path.to_path_buf(),
            source,
        })?;
    let filename = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());

    Ok(Form::new().part("file", Part::bytes(bytes).file_name(filename)))
}

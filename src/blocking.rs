//! Blocking facade over [`crate::ZohoClient`].
//!
//! Each call drives the async operation to completion on a private
//! current-thread runtime and buffers the response body. Must not be used
//! from inside an async context.

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};

use crate::auth::{OAuthConfig, TokenProvider};
use crate::error::Result;

/// Fully read HTTP response
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    url: Url,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    async fn read(response: reqwest::Response) -> Result<Self> {
        let status = response.status();
        let url = response.url().clone();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(Self {
            status,
            url,
            headers,
            body,
        })
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }
}

/// Blocking Zoho CRM API client
pub struct ZohoClient {
    inner: crate::client::ZohoClient,
    runtime: Runtime,
}

impl ZohoClient {
    pub fn new(base_url: impl Into<String>, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        Self::from_async(crate::client::ZohoClient::new(base_url, tokens)?)
    }

    pub fn from_oauth(base_url: impl Into<String>, config: OAuthConfig) -> Result<Self> {
        Self::from_async(crate::client::ZohoClient::from_oauth(base_url, config)?)
    }

    pub fn from_async(inner: crate::client::ZohoClient) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self { inner, runtime })
    }

    /// The wrapped async client
    pub fn inner(&self) -> &crate::client::ZohoClient {
        &self.inner
    }

    pub fn access_token(&self) -> Result<String> {
        self.runtime.block_on(self.inner.access_token())
    }

    pub fn create_record<T: Serialize + ?Sized>(&self, module: &str, data: &T) -> Result<Response> {
        self.run(self.inner.create_record(module, data))
    }

    pub fn read_record(&self, module: &str, id: &str) -> Result<Response> {
        self.run(self.inner.read_record(module, id))
    }

    pub fn read_records(&self, module: &str) -> Result<Response> {
        self.run(self.inner.read_records(module))
    }

    pub fn fetch_module_data(&self, module: &str) -> Result<Response> {
        self.run(self.inner.fetch_module_data(module))
    }

    pub fn update_record<T: Serialize + ?Sized>(
        &self,
        module: &str,
        id: &str,
        data: &T,
    ) -> Result<Response> {
        self.run(self.inner.update_record(module, id, data))
    }

    pub fn patch_record<T: Serialize + ?Sized>(
        &self,
        module: &str,
        id: &str,
        data: &T,
    ) -> Result<Response> {
        self.run(self.inner.patch_record(module, id, data))
    }

    pub fn delete_record(&self, module: &str, id: &str) -> Result<Response> {
        self.run(self.inner.delete_record(module, id))
    }

    pub fn attach_file(
        &self,
        module: &str,
        record_id: &str,
        file_path: Option<&Path>,
        file_url: Option<&str>,
    ) -> Result<Response> {
        self.run(self.inner.attach_file(module, record_id, file_path, file_url))
    }

    pub fn fetch_file(
        &self,
        module: &str,
        record_id: &str,
        file_id: Option<&str>,
        fetch_all: bool,
    ) -> Result<Response> {
        self.run(self.inner.fetch_file(module, record_id, file_id, fetch_all))
    }

    pub fn fetch_related_list(&self, module: &str, record_id: &str, name: &str) -> Result<Response> {
        self.run(self.inner.fetch_related_list(module, record_id, name))
    }

    fn run<F>(&self, request: F) -> Result<Response>
    where
        F: Future<Output = Result<reqwest::Response>>,
    {
        self.runtime.block_on(async {
            let response = request.await?;
            Response::read(response).await
        })
    }
}

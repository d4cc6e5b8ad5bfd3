//! [`FileApi`] over the console's REST endpoints.

use async_trait::async_trait;
use desk_blob::{Blob, LibraryStats, MetadataPatch};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::api::{FileApi, UploadFile};
use crate::ClientError;

#[derive(Clone, Debug)]
pub struct HttpFileApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct UploadResponse {
    file: Blob,
}

impl HttpFileApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn files_url(&self) -> String {
        format!("{}/api/files", self.base_url)
    }

    fn file_url(&self, stored_name: &str) -> String {
        format!("{}/{}", self.files_url(), urlencoding::encode(stored_name))
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Dashboard numbers for an optional `start`/`end` date range (`YYYY-MM-DD`).
    pub async fn stats(
        &self,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<LibraryStats, ClientError> {
        let req = self
            .client
            .get(format!("{}/api/stats", self.base_url))
            .query(&date_range(start, end));
        read_json(self.authorized(req).send().await?).await
    }

    /// The `Filename,URL` CSV behind the dashboard's export button.
    pub async fn export_csv(&self, start: Option<&str>, end: Option<&str>) -> Result<String, ClientError> {
        let req = self
            .client
            .get(format!("{}/api/stats/export", self.base_url))
            .query(&date_range(start, end));
        let res = self.authorized(req).send().await?;
        let status = res.status();
        if status.is_success() {
            return Ok(res.text().await?);
        }
        let body = res.json::<Value>().await.unwrap_or(Value::Null);
        Err(ClientError::from_response(status.as_u16(), &body))
    }
}

fn date_range<'a>(start: Option<&'a str>, end: Option<&'a str>) -> Vec<(&'static str, &'a str)> {
    let mut query = Vec::new();
    if let Some(start) = start {
        query.push(("start", start));
    }
    if let Some(end) = end {
        query.push(("end", end));
    }
    query
}

/// Deserialize a success body or turn an error body into a [`ClientError`].
pub(crate) async fn read_json<T: DeserializeOwned>(res: Response) -> Result<T, ClientError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res.json::<T>().await?);
    }
    let body = res.json::<Value>().await.unwrap_or(Value::Null);
    Err(ClientError::from_response(status.as_u16(), &body))
}

#[async_trait]
impl FileApi for HttpFileApi {
    async fn upload(&self, file: UploadFile) -> Result<Blob, ClientError> {
        if file.content.is_empty() {
            return Err(ClientError::EmptyPayload);
        }

        let mut part = Part::stream(file.content).file_name(file.name.clone());
        if let Some(ct) = &file.content_type {
            part = part.mime_str(ct)?;
        }
        let form = Form::new().part("file", part);

        let req = self.client.post(self.files_url()).multipart(form);
        let out: UploadResponse = read_json(self.authorized(req).send().await?).await?;
        tracing::debug!(stored_name = %out.file.stored_name, "uploaded");
        Ok(out.file)
    }

    async fn list(&self) -> Result<Vec<Blob>, ClientError> {
        let req = self.client.get(self.files_url());
        read_json(self.authorized(req).send().await?).await
    }

    async fn delete(&self, stored_name: &str) -> Result<(), ClientError> {
        let req = self.client.delete(self.file_url(stored_name));
        let _: Value = read_json(self.authorized(req).send().await?).await?;
        Ok(())
    }

    async fn edit(&self, stored_name: &str, patch: &MetadataPatch) -> Result<Blob, ClientError> {
        let req = self.client.patch(self.file_url(stored_name)).json(patch);
        read_json(self.authorized(req).send().await?).await
    }
}

//! REST client for the workspace sync server.
//!
//! Wire shape (JSON unless noted):
//! - `GET  /v1/api/file`                         -> `Vec<FileMetadata>`
//! - `GET  /v1/api/file/{id}`                     -> `multipart/mixed` with a
//!   `metadata` field (JSON) and a `file` part (octet-stream, base64-encoded
//!   only when the part carries a `Content-Transfer-Encoding: base64`
//!   header), decoded by the hand-rolled reader in `multipart`.
//! - `POST /v1/api/file`                          -> multipart form
//!   (`path` field + `file` part), returns `FileMetadata`, 201
//! - `DELETE /v1/api/file/{id}`                   -> 204 No Content
//! - `PATCH /v1/api/file/{id}`                    -> JSON `{ path }`, 204 No
//!   Content; the client re-fetches the file to learn the server's view of
//!   the rename (new `updatedAt`, etc).
//! - `GET  /v1/api/operation?fileId=..&from=..`   -> bare JSON array of
//!   `OperationRecord`, paginated client-side: a full-size page means there
//!   may be more, so the client keeps requesting from the last returned
//!   version until a short page comes back.

mod multipart;

use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use async_trait::async_trait;
use synctree_model::{File, FileContent, FileId, FileMetadata, OperationRecord};
use synctree_reconciler::{ApiClient, ReconcileError, Result};

/// A page this size or larger is assumed to possibly have more behind it.
const HISTORY_PAGE_SIZE: usize = 200;

fn to_api_err(err: reqwest::Error) -> ReconcileError {
    ReconcileError::Api(err.to_string())
}

fn to_api_err_msg(err: impl std::fmt::Display) -> ReconcileError {
    ReconcileError::Api(err.to_string())
}

pub struct SyncApiClient {
    client: Client,
    base_url: Url,
}

impl SyncApiClient {
    pub fn new(domain: &str, use_tls: bool) -> Result<Self> {
        let scheme = if use_tls { "https" } else { "http" };
        let base_url = Url::parse(&format!("{scheme}://{domain}")).map_err(|e| ReconcileError::Api(e.to_string()))?;
        Ok(Self { client: Client::new(), base_url })
    }

    /// Same as `new`, but every request carries `Authorization: Bearer
    /// <token>` — the shape a client ends up in after `login`.
    pub fn new_authenticated(domain: &str, use_tls: bool, token: &str) -> Result<Self> {
        let scheme = if use_tls { "https" } else { "http" };
        let base_url = Url::parse(&format!("{scheme}://{domain}")).map_err(to_api_err_msg)?;

        let mut auth_value =
            reqwest::header::HeaderValue::from_str(&format!("Bearer {token}")).map_err(to_api_err_msg)?;
        auth_value.set_sensitive(true);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(reqwest::header::AUTHORIZATION, auth_value);

        let client = Client::builder().default_headers(headers).build().map_err(to_api_err)?;
        Ok(Self { client, base_url })
    }

    /// `POST /v1/auth/login {name, password} -> {token}`. Exchanges workspace
    /// credentials for the bearer token used both on subsequent REST calls
    /// (via `new_authenticated`) and as the `?jwt=` query parameter on the
    /// websocket connection.
    pub async fn login(&self, workspace_name: &str, workspace_pass: &str) -> Result<String> {
        #[derive(Serialize)]
        struct LoginRequest<'a> {
            name: &'a str,
            password: &'a str,
        }
        #[derive(Deserialize)]
        struct LoginResponse {
            token: String,
        }

        let response = self
            .client
            .post(self.url("v1/auth/login"))
            .json(&LoginRequest { name: workspace_name, password: workspace_pass })
            .send()
            .await
            .map_err(to_api_err)?;
        let response = error_for_status(response).await?;
        let body: LoginResponse = response.json().await.map_err(to_api_err)?;
        Ok(body.token)
    }

    fn url(&self, path: &str) -> Url {
        self.base_url.join(path).expect("path is a valid relative URL")
    }

    async fn get_file_content(&self, id: FileId) -> Result<(FileMetadata, FileContent)> {
        let response = self
            .client
            .get(self.url(&format!("v1/api/file/{id}")))
            .send()
            .await
            .map_err(to_api_err)?;
        let response = error_for_status(response).await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.bytes().await.map_err(to_api_err)?;
        let parts = multipart::parse_parts(&content_type, &body)?;

        let metadata_part = parts
            .iter()
            .find(|p| p.name() == Some("metadata"))
            .ok_or_else(|| ReconcileError::Api("multipart response missing metadata part".into()))?;
        let metadata: FileMetadata = serde_json::from_slice(&metadata_part.body).map_err(to_api_err_msg)?;

        let file_part = parts
            .iter()
            .find(|p| p.name() == Some("file"))
            .ok_or_else(|| ReconcileError::Api("multipart response missing file part".into()))?;

        let raw_bytes = if file_part.is_base64() {
            let ascii: Vec<u8> = file_part.body.iter().copied().filter(|b| !b.is_ascii_whitespace()).collect();
            base64::engine::general_purpose::STANDARD.decode(ascii).map_err(to_api_err_msg)?
        } else {
            file_part.body.clone()
        };

        let content = match String::from_utf8(raw_bytes.clone()) {
            Ok(text) if metadata.mime_type.starts_with("text/") || metadata.mime_type == "application/json" => FileContent::Text(text),
            _ => FileContent::Binary(raw_bytes),
        };
        Ok((metadata, content))
    }

    fn to_file(metadata: FileMetadata, content: FileContent) -> File {
        File {
            id: metadata.id,
            workspace_path: metadata.workspace_path,
            mime_type: metadata.mime_type,
            hash: metadata.hash,
            version: metadata.version,
            created_at: metadata.created_at,
            updated_at: metadata.updated_at,
            content,
        }
    }
}

async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(ReconcileError::Api(format!("server returned {status}: {body}")))
}

#[derive(Serialize)]
struct RenameRequest<'a> {
    path: &'a str,
}

#[async_trait]
impl ApiClient for SyncApiClient {
    async fn fetch_remote_files(&self) -> Result<Vec<File>> {
        let response = self.client.get(self.url("v1/api/file")).send().await.map_err(to_api_err)?;
        let response = error_for_status(response).await?;
        let metadata_list: Vec<FileMetadata> = response.json().await.map_err(to_api_err)?;

        let contents = futures::future::join_all(metadata_list.iter().map(|m| self.get_file_content(m.id))).await;

        let mut files = Vec::with_capacity(contents.len());
        for result in contents {
            let (metadata, content) = result?;
            files.push(Self::to_file(metadata, content));
        }
        Ok(files)
    }

    async fn fetch_file_history(&self, file_id: FileId, since_version: u64) -> Result<Vec<OperationRecord>> {
        let mut records = Vec::new();
        let mut from = since_version;

        loop {
            let mut url = self.url("v1/api/operation");
            url.query_pairs_mut()
                .append_pair("fileId", &file_id.to_string())
                .append_pair("from", &from.to_string());

            let response = self.client.get(url).send().await.map_err(to_api_err)?;
            let response = error_for_status(response).await?;
            let page: Vec<OperationRecord> = response.json().await.map_err(to_api_err)?;

            let page_len = page.len();
            let last_version = page.last().map(|r| r.version);
            records.extend(page);

            match last_version {
                Some(v) if page_len >= HISTORY_PAGE_SIZE => from = v + 1,
                _ => break,
            }
        }

        Ok(records)
    }

    async fn push_create(&self, workspace_path: &str, content: &FileContent) -> Result<File> {
        let (bytes, content_type) = match content {
            FileContent::Text(text) => (text.clone().into_bytes(), mime::TEXT_PLAIN_UTF_8),
            FileContent::Binary(bytes) => (bytes.clone(), mime::APPLICATION_OCTET_STREAM),
        };

        let form = reqwest::multipart::Form::new().text("path", workspace_path.to_string()).part(
            "file",
            reqwest::multipart::Part::bytes(bytes).mime_str(content_type.as_ref()).map_err(to_api_err)?,
        );

        let response = self.client.post(self.url("v1/api/file")).multipart(form).send().await.map_err(to_api_err)?;
        let response = error_for_status(response).await?;
        let metadata: FileMetadata = response.json().await.map_err(to_api_err)?;

        Ok(Self::to_file(metadata, content.clone()))
    }

    async fn push_delete(&self, file_id: FileId) -> Result<()> {
        let response = self.client.delete(self.url(&format!("v1/api/file/{file_id}"))).send().await.map_err(to_api_err)?;
        error_for_status(response).await?;
        Ok(())
    }

    async fn push_rename(&self, file_id: FileId, new_path: &str) -> Result<File> {
        let response = self
            .client
            .patch(self.url(&format!("v1/api/file/{file_id}")))
            .json(&RenameRequest { path: new_path })
            .send()
            .await
            .map_err(to_api_err)?;
        // 204 No Content: the server doesn't echo metadata on the PATCH
        // response itself, so the client re-fetches to learn the rest of
        // what changed (updatedAt, etc).
        error_for_status(response).await?;

        let (metadata, content) = self.get_file_content(file_id).await?;
        Ok(Self::to_file(metadata, content))
    }
}

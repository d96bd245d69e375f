use std::io::Read;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{Credentials, SiteAddress};
use crate::error::SitisError;

const CHUNK_SIZE: usize = 8 * 1024;

pub trait RemoteSource {
    fn fetch(&self, file_name: &str) -> Option<Vec<u8>>;
}

impl RemoteSource for Box<dyn RemoteSource> {
    fn fetch(&self, file_name: &str) -> Option<Vec<u8>> {
        self.as_ref().fetch(file_name)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledRemote;

impl RemoteSource for DisabledRemote {
    fn fetch(&self, _file_name: &str) -> Option<Vec<u8>> {
        None
    }
}

#[derive(Debug)]
pub struct GraphSession {
    client: Client,
    token: String,
    drive_id: String,
    folder: String,
    base_url: String,
}

impl GraphSession {
    pub fn connect(
        credentials: &Credentials,
        site: &SiteAddress,
        folder: &str,
    ) -> Result<Self, SitisError> {
        if credentials.tenant_id.is_empty()
            || credentials.client_id.is_empty()
            || credentials.client_secret.is_empty()
        {
            return Err(SitisError::Authentication(
                "tenant id, client id and client secret are all required".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("sitis/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| SitisError::GraphHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| SitisError::GraphHttp(err.to_string()))?;

        let base_url = "https://graph.microsoft.com/v1.0".to_string();
        let token = acquire_token(&client, credentials)?;
        let site_id = resolve_site(&client, &base_url, &token, site)?;
        debug!(%site_id, "resolved sharepoint site");
        let drive_id = resolve_drive(&client, &base_url, &token, &site_id)?;
        debug!(%drive_id, "resolved document drive");

        Ok(Self {
            client,
            token,
            drive_id,
            folder: folder.trim_matches('/').to_string(),
            base_url,
        })
    }

    fn download(&self, file_name: &str) -> Result<Vec<u8>, SitisError> {
        let url = format!(
            "{}/drives/{}/root:/{}/{}:/content",
            self.base_url, self.drive_id, self.folder, file_name
        );
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .map_err(|err| SitisError::GraphHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "download failed".to_string());
            return Err(SitisError::GraphStatus { status, message });
        }
        let expected = response.content_length();
        read_body(response, expected)
    }
}

impl RemoteSource for GraphSession {
    fn fetch(&self, file_name: &str) -> Option<Vec<u8>> {
        match self.download(file_name) {
            Ok(bytes) => {
                debug!(file_name, len = bytes.len(), "downloaded from sharepoint");
                Some(bytes)
            }
            Err(err) => {
                warn!(file_name, %err, "remote fetch failed");
                None
            }
        }
    }
}

fn acquire_token(client: &Client, credentials: &Credentials) -> Result<String, SitisError> {
    let url = format!(
        "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
        credentials.tenant_id
    );
    let form = [
        ("grant_type", "client_credentials"),
        ("client_id", credentials.client_id.as_str()),
        ("client_secret", credentials.client_secret.as_str()),
        ("scope", "https://graph.microsoft.com/.default"),
    ];
    let response = client
        .post(&url)
        .form(&form)
        .send()
        .map_err(|err| SitisError::Authentication(err.to_string()))?;
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "token request failed".to_string());
        return Err(SitisError::Authentication(format!("status {status}: {message}")));
    }
    let body: Value = response
        .json()
        .map_err(|err| SitisError::Authentication(err.to_string()))?;
    body.get("access_token")
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| SitisError::Authentication("token response without access_token".to_string()))
}

fn resolve_site(
    client: &Client,
    base_url: &str,
    token: &str,
    site: &SiteAddress,
) -> Result<String, SitisError> {
    let url = format!("{base_url}/sites/{}:{}", site.hostname, site.site_path);
    get_identifier(client, &url, token, "site")
}

fn resolve_drive(
    client: &Client,
    base_url: &str,
    token: &str,
    site_id: &str,
) -> Result<String, SitisError> {
    let url = format!("{base_url}/sites/{site_id}/drive");
    get_identifier(client, &url, token, "drive")
}

fn get_identifier(client: &Client, url: &str, token: &str, what: &str) -> Result<String, SitisError> {
    let response = client
        .get(url)
        .bearer_auth(token)
        .send()
        .map_err(|err| SitisError::Resolution(format!("{what}: {err}")))?;
    if !response.status().is_success() {
        let status = response.status().as_u16();
        return Err(SitisError::Resolution(format!(
            "{what} lookup returned status {status}"
        )));
    }
    let body: Value = response
        .json()
        .map_err(|err| SitisError::Resolution(format!("{what}: {err}")))?;
    body.get("id")
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| SitisError::Resolution(format!("{what} response without id")))
}

pub fn read_body<R: Read>(mut reader: R, expected_len: Option<u64>) -> Result<Vec<u8>, SitisError> {
    let mut chunk = [0u8; CHUNK_SIZE];
    let mut body = Vec::new();
    loop {
        let n = reader
            .read(&mut chunk)
            .map_err(|err| SitisError::GraphHttp(err.to_string()))?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    if let Some(expected) = expected_len {
        if body.len() as u64 != expected {
            return Err(SitisError::GraphHttp(format!(
                "truncated download: {} of {expected} bytes",
                body.len()
            )));
        }
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use std::io::Cursor;

    use super::*;

    #[test]
    fn read_body_assembles_all_chunks() {
        // larger than one chunk so the loop runs more than once
        let payload: Vec<u8> = (0..CHUNK_SIZE * 3 + 17).map(|i| (i % 251) as u8).collect();
        let body = read_body(Cursor::new(payload.clone()), Some(payload.len() as u64)).unwrap();
        assert_eq!(body, payload);
    }

    #[test]
    fn read_body_detects_truncation() {
        let err = read_body(Cursor::new(b"short".to_vec()), Some(100)).unwrap_err();
        assert_matches!(err, SitisError::GraphHttp(_));
    }

    #[test]
    fn read_body_without_declared_length() {
        let body = read_body(Cursor::new(b"anything".to_vec()), None).unwrap();
        assert_eq!(body, b"anything");
    }

    #[test]
    fn disabled_remote_is_always_unavailable() {
        assert!(DisabledRemote.fetch("DAT_PER.csv").is_none());
    }

    #[test]
    fn connect_rejects_empty_credentials() {
        let credentials = Credentials {
            tenant_id: String::new(),
            client_id: "c".to_string(),
            client_secret: "s".to_string(),
        };
        let site = SiteAddress {
            hostname: "contoso.sharepoint.com".to_string(),
            site_path: "/sites/sitis".to_string(),
        };
        let err = GraphSession::connect(&credentials, &site, "SITIS/datos").unwrap_err();
        assert_matches!(err, SitisError::Authentication(_));
    }
}

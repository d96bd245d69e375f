use camino::Utf8PathBuf;

use crate::error::SitisError;

#[derive(Debug, Clone)]
pub struct Credentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteAddress {
    pub hostname: String,
    pub site_path: String,
}

impl SiteAddress {
    pub fn parse(url: &str) -> Result<Self, SitisError> {
        let trimmed = url.trim().trim_end_matches('/');
        let rest = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"))
            .ok_or_else(|| SitisError::Resolution(format!("site url missing scheme: {url}")))?;
        let (hostname, path) = match rest.split_once('/') {
            Some((host, path)) => (host, format!("/{path}")),
            None => (rest, String::new()),
        };
        if hostname.is_empty() || path.is_empty() {
            return Err(SitisError::Resolution(format!(
                "site url needs hostname and path: {url}"
            )));
        }
        Ok(Self {
            hostname: hostname.to_string(),
            site_path: path,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SharePointConfig {
    pub credentials: Option<Credentials>,
    pub site_url: String,
    pub folder_path: String,
    pub cache_dir: Utf8PathBuf,
    pub data_dir: Utf8PathBuf,
}

impl SharePointConfig {
    pub fn from_env() -> Self {
        let tenant_id = env_non_empty("SHAREPOINT_TENANT_ID");
        let client_id = env_non_empty("SHAREPOINT_CLIENT_ID");
        let client_secret = env_non_empty("SHAREPOINT_CLIENT_SECRET");
        let credentials = match (tenant_id, client_id, client_secret) {
            (Some(tenant_id), Some(client_id), Some(client_secret)) => Some(Credentials {
                tenant_id,
                client_id,
                client_secret,
            }),
            _ => None,
        };

        Self {
            credentials,
            site_url: env_non_empty("SHAREPOINT_SITE_URL").unwrap_or_default(),
            folder_path: env_non_empty("SHAREPOINT_FOLDER_PATH")
                .unwrap_or_else(|| "SITIS/datos".to_string()),
            cache_dir: env_non_empty("SITIS_CACHE_DIR")
                .map(Utf8PathBuf::from)
                .unwrap_or_else(|| Utf8PathBuf::from("./cache_sharepoint")),
            data_dir: env_non_empty("SITIS_DATA_DIR")
                .map(Utf8PathBuf::from)
                .unwrap_or_else(|| Utf8PathBuf::from(".")),
        }
    }

    pub fn remote_settings(&self) -> Option<(Credentials, SiteAddress)> {
        let credentials = self.credentials.clone()?;
        let site = SiteAddress::parse(&self.site_url).ok()?;
        Some((credentials, site))
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_site_url() {
        let site = SiteAddress::parse("https://contoso.sharepoint.com/sites/sitis").unwrap();
        assert_eq!(site.hostname, "contoso.sharepoint.com");
        assert_eq!(site.site_path, "/sites/sitis");
    }

    #[test]
    fn parse_site_url_trailing_slash() {
        let site = SiteAddress::parse("https://contoso.sharepoint.com/sites/sitis/").unwrap();
        assert_eq!(site.site_path, "/sites/sitis");
    }

    #[test]
    fn parse_site_url_rejects_missing_scheme() {
        let err = SiteAddress::parse("contoso.sharepoint.com/sites/sitis").unwrap_err();
        assert_matches!(err, SitisError::Resolution(_));
    }

    #[test]
    fn parse_site_url_rejects_bare_host() {
        let err = SiteAddress::parse("https://contoso.sharepoint.com").unwrap_err();
        assert_matches!(err, SitisError::Resolution(_));
    }

    #[test]
    fn remote_settings_require_credentials_and_site() {
        let config = SharePointConfig {
            credentials: None,
            site_url: "https://contoso.sharepoint.com/sites/sitis".to_string(),
            folder_path: "SITIS/datos".to_string(),
            cache_dir: Utf8PathBuf::from("./cache_sharepoint"),
            data_dir: Utf8PathBuf::from("."),
        };
        assert!(config.remote_settings().is_none());

        let with_creds = SharePointConfig {
            credentials: Some(Credentials {
                tenant_id: "t".to_string(),
                client_id: "c".to_string(),
                client_secret: "s".to_string(),
            }),
            ..config
        };
        assert!(with_creds.remote_settings().is_some());
    }
}

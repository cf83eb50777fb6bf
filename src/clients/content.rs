//! Source-hosting content API: read the revision marker of a file and
//! push a new version of it.

use crate::clients::http::{build_client, ensure_success, request_error};
use crate::config::{HttpConfig, RemoteConfig};
use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const ACCEPT: &str = "application/vnd.github+json";

#[derive(Debug, Deserialize)]
struct FileInfo {
    sha: String,
}

#[derive(Debug, Serialize)]
struct PutBody<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

/// Client for one file in one repository.
#[derive(Debug, Clone)]
pub struct ContentClient {
    read: Client,
    write: Client,
    url: Url,
    branch: Option<String>,
    token: String,
}

impl ContentClient {
    /// Create a client for the configured remote file.
    pub fn new(http: &HttpConfig, remote: &RemoteConfig, token: impl Into<String>) -> Result<Self> {
        let repository = remote
            .repository
            .as_deref()
            .ok_or(Error::RemoteNotConfigured)?;
        Ok(Self {
            read: build_client(&http.user_agent, http.content_read_timeout_secs)?,
            write: build_client(&http.user_agent, http.content_write_timeout_secs)?,
            url: contents_url(&remote.api_url, repository, &remote.path)?,
            branch: remote.branch.clone(),
            token: token.into(),
        })
    }

    /// Contents URL of the file.
    pub fn url(&self) -> &Url {
        &self.url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.token).header("Accept", ACCEPT)
    }

    /// Current revision marker of the file, `None` when it does not exist yet.
    pub async fn get_revision(&self) -> Result<Option<String>> {
        let mut url = self.url.clone();
        if let Some(branch) = &self.branch {
            url.query_pairs_mut().append_pair("ref", branch);
        }
        debug!("GET {url}");
        let response = self
            .authorize(self.read.get(url.clone()))
            .send()
            .await
            .map_err(|e| request_error(url.as_str(), e))?;

        if response.status() == StatusCode::NOT_FOUND {
            info!("Remote file does not exist yet, it will be created");
            return Ok(None);
        }
        let response = ensure_success("content GET", response).await?;
        let info: FileInfo = response
            .json()
            .await
            .map_err(|e| request_error(url.as_str(), e))?;
        Ok(Some(info.sha))
    }

    /// Upload `content` as the new file version.
    ///
    /// `sha` must be the revision the content was based on; a stale marker
    /// is rejected with [`Error::RevisionConflict`].
    pub async fn put_file(&self, content: &[u8], message: &str, sha: Option<&str>) -> Result<()> {
        let body = PutBody {
            message,
            content: STANDARD.encode(content),
            sha,
            branch: self.branch.as_deref(),
        };
        debug!("PUT {} ({} bytes)", self.url, content.len());
        let response = self
            .authorize(self.write.put(self.url.clone()))
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error(self.url.as_str(), e))?;

        let status = response.status();
        if status == StatusCode::CONFLICT {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::RevisionConflict {
                status: status.as_u16(),
                body,
            });
        }
        ensure_success("content PUT", response).await?;
        info!("Pushed {} to remote", self.url);
        Ok(())
    }
}

/// `{api}/repos/{owner}/{name}/contents/{path}`.
pub fn contents_url(api_url: &str, repository: &str, path: &str) -> Result<Url> {
    let mut url = Url::parse(api_url).map_err(|e| Error::RemoteRequest {
        url: api_url.to_string(),
        source: Box::new(e),
    })?;
    {
        let mut segments = url.path_segments_mut().map_err(|()| Error::Internal {
            message: format!("content API URL cannot take path segments: {api_url}"),
        })?;
        segments.pop_if_empty().push("repos");
        segments.extend(repository.split('/'));
        segments.push("contents");
        segments.extend(path.split('/').filter(|s| !s.is_empty()));
    }
    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::clients::test_server::TestServer;

    fn remote() -> RemoteConfig {
        RemoteConfig {
            repository: Some("someone/bird-dashboard".to_string()),
            path: "data/UK Birds.csv".to_string(),
            ..RemoteConfig::default()
        }
    }

    #[test]
    fn test_contents_url() {
        let url = contents_url("https://api.github.com", "someone/bird-dashboard", "data/UK Birds.csv")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/someone/bird-dashboard/contents/data/UK%20Birds.csv"
        );
    }

    #[test]
    fn test_requires_repository() {
        let err = ContentClient::new(&HttpConfig::default(), &RemoteConfig::default(), "t").unwrap_err();
        assert!(matches!(err, Error::RemoteNotConfigured));
    }

    #[test]
    fn test_put_body_shape() {
        let body = PutBody {
            message: "Update species status: Erithacus rubecula -> Resident",
            content: STANDARD.encode(b"Common Name,Latin Name,Status\n"),
            sha: None,
            branch: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("sha").is_none());
        assert!(json.get("branch").is_none());
        assert_eq!(json["content"], "Q29tbW9uIE5hbWUsTGF0aW4gTmFtZSxTdGF0dXMK");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_error() {
        let http = HttpConfig {
            content_read_timeout_secs: 2,
            ..HttpConfig::default()
        };
        let remote = RemoteConfig {
            api_url: "http://127.0.0.1:9".to_string(),
            ..remote()
        };
        let client = ContentClient::new(&http, &remote, "token").unwrap();
        assert!(matches!(
            client.get_revision().await,
            Err(Error::RemoteRequest { .. })
        ));
    }

    fn local_client(server: &TestServer) -> ContentClient {
        let remote = RemoteConfig {
            api_url: server.url.clone(),
            ..remote()
        };
        ContentClient::new(&HttpConfig::default(), &remote, "token").unwrap()
    }

    #[tokio::test]
    async fn test_get_revision_reads_sha() {
        let server = TestServer::start(vec![(200, r#"{"sha":"abc"}"#)]);
        let client = local_client(&server);
        assert_eq!(client.get_revision().await.unwrap().as_deref(), Some("abc"));

        let requests = server.requests();
        assert!(requests[0].request_line.starts_with("GET /repos/someone/bird-dashboard/contents/"));
    }

    #[tokio::test]
    async fn test_missing_file_has_no_revision() {
        let server = TestServer::start(vec![(404, r#"{"message":"Not Found"}"#)]);
        let client = local_client(&server);
        assert!(client.get_revision().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_sends_revision_and_content() {
        let server = TestServer::start(vec![(200, "{}")]);
        let client = local_client(&server);
        client
            .put_file(b"Common Name,Latin Name,Status\n", "Add species status", Some("abc"))
            .await
            .unwrap();

        let requests = server.requests();
        assert!(requests[0].request_line.starts_with("PUT "));
        let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
        assert_eq!(body["sha"], "abc");
        assert_eq!(body["message"], "Add species status");
        assert_eq!(body["content"], "Q29tbW9uIE5hbWUsTGF0aW4gTmFtZSxTdGF0dXMK");
    }

    #[tokio::test]
    async fn test_stale_revision_is_conflict() {
        let server = TestServer::start(vec![(409, r#"{"message":"sha does not match"}"#)]);
        let client = local_client(&server);
        let err = client.put_file(b"x", "msg", Some("stale")).await.unwrap_err();
        assert!(matches!(
            err,
            Error::RevisionConflict { status: 409, ref body } if body.contains("sha does not match")
        ));
    }
}

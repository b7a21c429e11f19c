//! Thin client for the GitHub Contents API, used to mirror published
//! exercise folders to a remote repository.
//!
//! Directory deletion is best-effort by contract: per-file failures are
//! counted and deletion continues, so a failure partway through leaves a
//! partially deleted directory. There is no retry and no cancellation;
//! every request runs to completion or failure.

use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;

use crate::config::RemoteSection;
use crate::error::{classify_status, ErrorContext, RemoteErrorKind, Result, StoreError};

const USER_AGENT: &str = concat!("exstore/", env!("CARGO_PKG_VERSION"));

/// Remote repository identity and credential, passed in explicitly.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub owner: String,
    pub repo: String,
    pub token: String,
    pub api_base: String,
}

impl RemoteConfig {
    /// Build from the `[remote]` config section. Owner, repo and a token
    /// (config or `GITHUB_TOKEN`) are required.
    pub fn from_settings(section: &RemoteSection) -> Result<Self> {
        let owner = section.owner.clone().ok_or_else(|| StoreError::Config {
            message: "remote.owner is not set".to_string(),
            path: None,
        })?;
        let repo = section.repo.clone().ok_or_else(|| StoreError::Config {
            message: "remote.repo is not set".to_string(),
            path: None,
        })?;
        let token = section.resolve_token().ok_or_else(|| StoreError::Config {
            message: "no remote token (set remote.token or GITHUB_TOKEN)".to_string(),
            path: None,
        })?;

        Ok(Self {
            owner,
            repo,
            token,
            api_base: section.api_base.clone(),
        })
    }
}

/// One entry of a remote directory listing.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Version token required to delete or overwrite the entry. The remote
    /// store owns these; re-fetch before acting on one.
    pub sha: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    #[serde(other)]
    Other,
}

/// Best-effort result of a recursive directory delete.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeleteOutcome {
    pub deleted: usize,
    pub failed: usize,
}

impl DeleteOutcome {
    pub fn attempted(&self) -> usize {
        self.deleted + self.failed
    }

    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

/// Request/response wrapper over the remote content store.
pub struct RemoteClient {
    config: RemoteConfig,
    client: reqwest::blocking::Client,
}

impl RemoteClient {
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| StoreError::Generic {
                message: "Failed to create HTTP client".to_string(),
                source: Some(Box::new(e)),
            })?;

        Ok(Self { config, client })
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.config.api_base,
            self.config.owner,
            self.config.repo,
            path.trim_matches('/')
        )
    }

    fn remote_err(&self, operation: &str, path: &str, kind: RemoteErrorKind) -> StoreError {
        StoreError::Remote {
            operation: operation.to_string(),
            path: path.to_string(),
            kind,
        }
    }

    fn send_err(&self, operation: &str, path: &str, e: reqwest::Error) -> StoreError {
        StoreError::Generic {
            message: format!("Remote {} of '{}' failed to send", operation, path),
            source: Some(Box::new(e)),
        }
    }

    /// Upload or overwrite one file. The current version token is
    /// re-fetched first so an overwrite acts on fresh remote state.
    pub fn put_file(&self, path: &str, content: &[u8], message: &str) -> Result<()> {
        let sha = self.fetch_sha(path)?;

        let mut body = serde_json::json!({
            "message": message,
            "content": STANDARD.encode(content),
        });
        if let Some(sha) = sha {
            body["sha"] = serde_json::Value::String(sha);
        }

        let response = self
            .client
            .put(self.contents_url(path))
            .bearer_auth(&self.config.token)
            .json(&body)
            .send()
            .map_err(|e| self.send_err("upload", path, e))?;

        if !response.status().is_success() {
            return Err(self.remote_err("upload", path, classify_status(response.status().as_u16())));
        }
        Ok(())
    }

    /// List a remote directory. `NotFound` if it does not exist.
    pub fn list_directory(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        let response = self
            .client
            .get(self.contents_url(path))
            .bearer_auth(&self.config.token)
            .send()
            .map_err(|e| self.send_err("listing", path, e))?;

        if !response.status().is_success() {
            return Err(self.remote_err("listing", path, classify_status(response.status().as_u16())));
        }

        let json: serde_json::Value = response.json().map_err(|e| StoreError::Generic {
            message: format!("Failed to parse listing of '{}'", path),
            source: Some(Box::new(e)),
        })?;

        parse_listing(path, json)
    }

    /// Delete one remote file. The caller's version token must match the
    /// current remote state or the store rejects the call.
    pub fn delete_file(&self, path: &str, sha: &str, message: &str) -> Result<()> {
        let body = serde_json::json!({
            "message": message,
            "sha": sha,
        });

        let response = self
            .client
            .delete(self.contents_url(path))
            .bearer_auth(&self.config.token)
            .json(&body)
            .send()
            .map_err(|e| self.send_err("delete", path, e))?;

        if !response.status().is_success() {
            return Err(self.remote_err("delete", path, classify_status(response.status().as_u16())));
        }
        Ok(())
    }

    /// Delete a remote directory file by file, recursing into
    /// subdirectories. Not transactional: per-file failures are counted and
    /// the walk continues.
    pub fn delete_directory(&self, path: &str, message: &str) -> Result<DeleteOutcome> {
        let entries = self.list_directory(path)?;
        let mut outcome = DeleteOutcome::default();

        for entry in entries {
            match entry.kind {
                EntryKind::Dir => match self.delete_directory(&entry.path, message) {
                    Ok(sub) => {
                        outcome.deleted += sub.deleted;
                        outcome.failed += sub.failed;
                    }
                    Err(_) => outcome.failed += 1,
                },
                EntryKind::File | EntryKind::Other => {
                    match self.delete_file(&entry.path, &entry.sha, message) {
                        Ok(()) => outcome.deleted += 1,
                        Err(_) => outcome.failed += 1,
                    }
                }
            }
        }

        Ok(outcome)
    }

    /// Mirror a local folder to the remote prefix, file by file. Stops on
    /// the first failed upload. Returns the number of uploaded files.
    pub fn push_directory(&self, local: &Path, remote_prefix: &str, message: &str) -> Result<usize> {
        let mut uploaded = 0;
        self.push_dir_inner(local, remote_prefix.trim_matches('/'), message, &mut uploaded)?;
        Ok(uploaded)
    }

    fn push_dir_inner(
        &self,
        local: &Path,
        prefix: &str,
        message: &str,
        uploaded: &mut usize,
    ) -> Result<()> {
        let entries = fs::read_dir(local)
            .with_io_context(|| format!("reading {}", local.display()))?;

        for entry in entries {
            let entry = entry.with_io_context(|| "reading local entry".to_string())?;
            let name = entry.file_name().to_string_lossy().to_string();
            let remote_path = format!("{}/{}", prefix, name);

            if entry
                .file_type()
                .with_io_context(|| format!("inspecting {}", entry.path().display()))?
                .is_dir()
            {
                self.push_dir_inner(&entry.path(), &remote_path, message, uploaded)?;
            } else {
                let content = fs::read(entry.path())
                    .with_io_context(|| format!("reading {}", entry.path().display()))?;
                self.put_file(&remote_path, &content, message)?;
                *uploaded += 1;
            }
        }
        Ok(())
    }

    /// Current version token for a remote path, or `None` when absent.
    fn fetch_sha(&self, path: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(self.contents_url(path))
            .bearer_auth(&self.config.token)
            .send()
            .map_err(|e| self.send_err("lookup", path, e))?;

        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(self.remote_err("lookup", path, classify_status(response.status().as_u16())));
        }

        let json: serde_json::Value = response.json().map_err(|e| StoreError::Generic {
            message: format!("Failed to parse lookup of '{}'", path),
            source: Some(Box::new(e)),
        })?;

        Ok(json["sha"].as_str().map(str::to_string))
    }
}

fn parse_listing(path: &str, json: serde_json::Value) -> Result<Vec<RemoteEntry>> {
    if !json.is_array() {
        // A file path answers with a single object, not a listing
        return Err(StoreError::InvalidInput {
            message: format!("remote path '{}' is not a directory", path),
        });
    }

    serde_json::from_value(json).map_err(|e| StoreError::Generic {
        message: format!("Failed to parse listing of '{}'", path),
        source: Some(Box::new(e)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RemoteConfig {
        RemoteConfig {
            owner: "octocat".to_string(),
            repo: "exercises".to_string(),
            token: "token".to_string(),
            api_base: "https://api.github.com".to_string(),
        }
    }

    #[test]
    fn contents_url_joins_repo_identity_and_path() {
        let client = RemoteClient::new(config()).unwrap();
        assert_eq!(
            client.contents_url("exercises/quiz/index.html"),
            "https://api.github.com/repos/octocat/exercises/contents/exercises/quiz/index.html"
        );
        // Leading and trailing slashes are normalized
        assert_eq!(
            client.contents_url("/exercises/quiz/"),
            "https://api.github.com/repos/octocat/exercises/contents/exercises/quiz"
        );
    }

    #[test]
    fn listing_parses_entries_with_version_tokens() {
        let json = serde_json::json!([
            {"name": "index.html", "path": "exercises/quiz/index.html", "type": "file", "sha": "abc123"},
            {"name": "assets", "path": "exercises/quiz/assets", "type": "dir", "sha": "def456"}
        ]);

        let entries = parse_listing("exercises/quiz", json).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, EntryKind::File);
        assert_eq!(entries[0].sha, "abc123");
        assert_eq!(entries[1].kind, EntryKind::Dir);
    }

    #[test]
    fn listing_a_file_is_rejected() {
        let json = serde_json::json!({"name": "index.html", "type": "file", "sha": "abc"});
        assert!(parse_listing("exercises/quiz/index.html", json).is_err());
    }

    #[test]
    fn delete_outcome_reports_partial_success() {
        let outcome = DeleteOutcome { deleted: 4, failed: 1 };
        assert_eq!(outcome.attempted(), 5);
        assert!(!outcome.is_complete());
    }

    #[test]
    fn from_settings_requires_identity_and_token() {
        let mut section = RemoteSection::default();
        section.token = Some("t".to_string());
        assert!(RemoteConfig::from_settings(&section).is_err());

        section.owner = Some("octocat".to_string());
        section.repo = Some("exercises".to_string());
        let config = RemoteConfig::from_settings(&section).unwrap();
        assert_eq!(config.owner, "octocat");
        assert_eq!(config.api_base, "https://api.github.com");
    }
}

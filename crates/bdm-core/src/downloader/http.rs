//! GitHub REST API backend over libcurl.
//!
//! Looks the release up by tag, picks the asset by glob `pattern`, then
//! streams it to a `.part` file that is renamed into place on success.

use super::Downloader;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = concat!("bdm/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct Release {
    #[serde(default)]
    assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Clone, Deserialize)]
struct ReleaseAsset {
    name: String,
    /// API URL of the asset; serves the binary with `Accept: application/octet-stream`.
    url: String,
}

/// Downloads release assets through the GitHub REST API.
#[derive(Debug, Clone)]
pub struct HttpReleaseDownloader {
    api_url: String,
    token: Option<String>,
}

impl HttpReleaseDownloader {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Picks up `GH_TOKEN` or `GITHUB_TOKEN`, as `gh` does.
    pub fn with_env_token(self) -> Self {
        let token = ["GH_TOKEN", "GITHUB_TOKEN"]
            .iter()
            .find_map(|name| std::env::var(name).ok().filter(|v| !v.trim().is_empty()));
        self.with_token(token)
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// `<api>/repos/<owner>/<name>/releases/tags/<tag>`, each segment percent-encoded.
    fn release_url(&self, repo: &str, tag: &str) -> Result<Url> {
        let Some((owner, name)) = repo.split_once('/') else {
            bail!("repository '{}' is not in owner/name form", repo);
        };
        let mut url = Url::parse(&self.api_url)
            .with_context(|| format!("invalid API URL '{}'", self.api_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("API URL '{}' cannot be a base", self.api_url))?
            .pop_if_empty()
            .extend(["repos", owner, name, "releases", "tags", tag]);
        Ok(url)
    }

    fn headers(&self, accept: &str) -> Result<curl::easy::List> {
        let mut list = curl::easy::List::new();
        list.append(&format!("Accept: {}", accept))?;
        list.append("X-GitHub-Api-Version: 2022-11-28")?;
        if let Some(token) = &self.token {
            list.append(&format!("Authorization: Bearer {}", token.trim()))?;
        }
        Ok(list)
    }

    fn easy(&self, url: &str, accept: &str) -> Result<curl::easy::Easy> {
        let mut easy = curl::easy::Easy::new();
        easy.url(url).context("invalid URL")?;
        easy.useragent(USER_AGENT)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(Duration::from_secs(30))?;
        easy.low_speed_limit(1024)?;
        easy.low_speed_time(Duration::from_secs(60))?;
        easy.http_headers(self.headers(accept)?)?;
        Ok(easy)
    }

    fn fetch_release(&self, repo: &str, tag: &str) -> Result<Release> {
        let url = self.release_url(repo, tag)?;
        let mut body = Vec::new();
        let mut easy = self.easy(url.as_str(), "application/vnd.github+json")?;
        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform().context("release lookup failed")?;
        }
        let code = easy.response_code().context("no response code")?;
        if !(200..300).contains(&code) {
            bail!(
                "GET {} returned HTTP {}: {}",
                url,
                code,
                String::from_utf8_lossy(&body).trim()
            );
        }
        serde_json::from_slice(&body).with_context(|| format!("invalid release JSON from {}", url))
    }

    /// Streams `url` to `output_file` via a `.part` sibling. Returns bytes written.
    fn fetch_to_file(&self, url: &str, output_file: &Path) -> Result<u64> {
        let part = part_path(output_file);
        let result = self.fetch_to_part(url, &part).and_then(|written| {
            fs::rename(&part, output_file).with_context(|| {
                format!("rename {} to {}", part.display(), output_file.display())
            })?;
            Ok(written)
        });
        if result.is_err() && part.exists() {
            let _ = fs::remove_file(&part);
        }
        result
    }

    fn fetch_to_part(&self, url: &str, part: &Path) -> Result<u64> {
        let mut file = File::create(part).with_context(|| format!("create {}", part.display()))?;
        let mut written = 0u64;
        let mut write_error: Option<std::io::Error> = None;
        let mut easy = self.easy(url, "application/octet-stream")?;
        let performed = {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| match file.write_all(data) {
                Ok(()) => {
                    written += data.len() as u64;
                    Ok(data.len())
                }
                Err(e) => {
                    write_error = Some(e);
                    Ok(0) // abort transfer
                }
            })?;
            transfer.perform()
        };

        if let Some(e) = write_error {
            return Err(anyhow::Error::new(e).context(format!("write {}", part.display())));
        }
        performed.context("asset GET failed")?;
        let code = easy.response_code().context("no response code")?;
        if !(200..300).contains(&code) {
            bail!("GET {} returned HTTP {}", url, code);
        }
        file.flush()?;
        Ok(written)
    }
}

impl Downloader for HttpReleaseDownloader {
    fn download_release_asset(
        &self,
        repo: &str,
        tag: &str,
        pattern: Option<&str>,
        output_file: &Path,
    ) -> Result<()> {
        let release = self
            .fetch_release(repo, tag)
            .with_context(|| format!("release {} of {}", tag, repo))?;
        let asset = select_asset(&release.assets, pattern)
            .with_context(|| format!("release {} of {}", tag, repo))?;
        tracing::info!(
            "[Download] {} ({}) release asset {} to {}",
            repo,
            tag,
            asset.name,
            output_file.display()
        );
        let bytes = self.fetch_to_file(&asset.url, output_file)?;
        tracing::debug!("[Download] wrote {} bytes to {}", bytes, output_file.display());
        Ok(())
    }
}

/// Exactly one asset must match: by glob `pattern`, or the only asset when no pattern is given.
fn select_asset<'a>(assets: &'a [ReleaseAsset], pattern: Option<&str>) -> Result<&'a ReleaseAsset> {
    let matches: Vec<&ReleaseAsset> = match pattern {
        Some(p) => {
            let glob = glob::Pattern::new(p).with_context(|| format!("invalid pattern '{}'", p))?;
            assets.iter().filter(|a| glob.matches(&a.name)).collect()
        }
        None => assets.iter().collect(),
    };
    match matches.as_slice() {
        [single] => Ok(*single),
        [] => bail!(
            "no asset matches {} (available: {})",
            pattern.unwrap_or("<any>"),
            names(assets)
        ),
        many => bail!(
            "{} assets match {}: {}; set a more specific pattern",
            many.len(),
            pattern.unwrap_or("<any>"),
            many.iter().map(|a| a.name.as_str()).collect::<Vec<_>>().join(", ")
        ),
    }
}

fn names(assets: &[ReleaseAsset]) -> String {
    if assets.is_empty() {
        return "none".to_string();
    }
    assets.iter().map(|a| a.name.as_str()).collect::<Vec<_>>().join(", ")
}

fn part_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(".part");
    PathBuf::from(o)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::{Arc, Mutex};
    use std::thread;

    fn asset(name: &str) -> ReleaseAsset {
        ReleaseAsset {
            name: name.to_string(),
            url: format!("https://api.example.com/assets/{}", name),
        }
    }

    #[test]
    fn select_by_glob_pattern() {
        let assets = vec![asset("lib-macos.zip"), asset("lib-linux.zip"), asset("checksums.txt")];
        assert_eq!(select_asset(&assets, Some("*linux*")).unwrap().name, "lib-linux.zip");
        assert_eq!(select_asset(&assets, Some("checksums.txt")).unwrap().name, "checksums.txt");
    }

    #[test]
    fn ambiguous_pattern_is_error() {
        let assets = vec![asset("a.zip"), asset("b.zip")];
        let err = select_asset(&assets, Some("*.zip")).unwrap_err();
        assert!(err.to_string().contains("a.zip, b.zip"), "{}", err);
    }

    #[test]
    fn no_pattern_requires_single_asset() {
        assert_eq!(select_asset(&[asset("only.zip")], None).unwrap().name, "only.zip");
        assert!(select_asset(&[asset("a.zip"), asset("b.zip")], None).is_err());
        assert!(select_asset(&[], None).is_err());
    }

    #[test]
    fn release_url_encodes_tag_segment() {
        let http = HttpReleaseDownloader::new("https://ghe.example.com/api/v3/");
        assert_eq!(
            http.release_url("org/repo", "1.0.0").unwrap().as_str(),
            "https://ghe.example.com/api/v3/repos/org/repo/releases/tags/1.0.0"
        );
        assert_eq!(
            http.release_url("org/repo", "v1 beta#2?x").unwrap().as_str(),
            "https://ghe.example.com/api/v3/repos/org/repo/releases/tags/v1%20beta%232%3Fx"
        );
        assert_eq!(
            http.release_url("org/repo", "release/1.0").unwrap().as_str(),
            "https://ghe.example.com/api/v3/repos/org/repo/releases/tags/release%2F1.0"
        );
    }

    #[test]
    fn release_url_requires_owner_and_name() {
        let http = HttpReleaseDownloader::new(DEFAULT_API_URL);
        assert!(http.release_url("repo-only", "1.0.0").is_err());
    }

    #[test]
    fn part_path_appends_suffix() {
        assert_eq!(part_path(Path::new("/c/abc.zip")), PathBuf::from("/c/abc.zip.part"));
    }

    /// Serves the release JSON and one asset body; records request paths.
    fn start_server(asset_body: Vec<u8>) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let base = format!("http://127.0.0.1:{}", listener.local_addr().unwrap().port());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);
        let release = format!(
            r#"{{"tag_name":"1.0.0","assets":[
                {{"name":"lib.zip","url":"{base}/assets/1"}},
                {{"name":"other.tar.gz","url":"{base}/assets/2"}}
            ]}}"#
        );
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                        break;
                    }
                }
                let path = request_line.split_whitespace().nth(1).unwrap_or("/").to_string();
                seen.lock().unwrap().push(path.clone());
                let (status, body): (&str, Vec<u8>) = match path.as_str() {
                    "/repos/org/repo/releases/tags/1.0.0" => {
                        ("200 OK", release.as_bytes().to_vec())
                    }
                    "/assets/1" => ("200 OK", asset_body.clone()),
                    _ => ("404 Not Found", b"{\"message\":\"Not Found\"}".to_vec()),
                };
                let mut stream = stream;
                let _ = write!(
                    stream,
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    status,
                    body.len()
                );
                let _ = stream.write_all(&body);
            }
        });
        (base, requests)
    }

    #[test]
    fn downloads_matching_asset_from_local_api() {
        let body: Vec<u8> = (0u8..200).cycle().take(10_000).collect();
        let (base, requests) = start_server(body.clone());
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("abc.zip");

        HttpReleaseDownloader::new(format!("{}/", base))
            .download_release_asset("org/repo", "1.0.0", Some("*.zip"), &out)
            .unwrap();

        assert_eq!(fs::read(&out).unwrap(), body);
        assert!(!part_path(&out).exists());
        let seen = requests.lock().unwrap().clone();
        assert_eq!(seen, vec!["/repos/org/repo/releases/tags/1.0.0", "/assets/1"]);
    }

    #[test]
    fn missing_release_is_error_and_leaves_no_file() {
        let (base, _) = start_server(Vec::new());
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("abc.zip");

        let err = HttpReleaseDownloader::new(base)
            .download_release_asset("org/repo", "9.9.9", None, &out)
            .unwrap_err();
        assert!(format!("{:#}", err).contains("HTTP 404"), "{:#}", err);
        assert!(!out.exists());
    }
}

// src/fetch/drive.rs
use crate::error::FetchError;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{header::CONTENT_TYPE, Client};
use scraper::{Html, Selector};
use tracing::{debug, trace};
use url::Url;

/// Direct-download endpoint of the file host.
pub const DEFAULT_DOWNLOAD_ENDPOINT: &str = "https://drive.google.com/uc";

static SHARE_PATH_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/d/([a-zA-Z0-9_-]+)").expect("share path regex should compile"));
static BARE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]{10,}$").expect("file id regex should compile"));
static CONFIRM_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"confirm=([0-9A-Za-z_-]+)").expect("confirm token regex should compile")
});

/// Accepts a bare file id or any share URL (`.../file/d/<id>/view`,
/// `...?id=<id>`) and returns the file id.
pub fn extract_file_id(input: &str) -> Result<String, FetchError> {
    let input = input.trim();
    if BARE_ID.is_match(input) {
        return Ok(input.to_string());
    }

    if let Ok(url) = Url::parse(input) {
        if let Some(caps) = SHARE_PATH_ID.captures(url.path()) {
            return Ok(caps[1].to_string());
        }
        if let Some((_, id)) = url.query_pairs().find(|(k, _)| k == "id") {
            if BARE_ID.is_match(&id) {
                return Ok(id.into_owned());
            }
        }
    }
    Err(FetchError::InvalidFileId(input.to_string()))
}

/// The direct-download URL for `file_id` under `endpoint`.
pub fn download_url(endpoint: &str, file_id: &str) -> Result<Url, FetchError> {
    Url::parse_with_params(endpoint, &[("export", "download"), ("id", file_id)])
        .map_err(|_| FetchError::InvalidFileId(file_id.to_string()))
}

/// Large files are served behind an HTML "can't scan for viruses" page. Builds
/// the confirmation URL from its download form, or from a bare `confirm=`
/// token, or from the `download_warning` cookie value.
pub fn confirmation_url(
    page: &str,
    endpoint: &str,
    file_id: &str,
    cookie_token: Option<&str>,
) -> Option<Url> {
    let doc = Html::parse_document(page);
    let form_sel = Selector::parse("form#download-form").expect("form selector should parse");
    let input_sel = Selector::parse(r#"input[type="hidden"]"#).expect("input selector should parse");

    if let Some(form) = doc.select(&form_sel).next() {
        if let Some(mut url) = form.value().attr("action").and_then(|a| Url::parse(a).ok()) {
            {
                let mut query = url.query_pairs_mut();
                for input in form.select(&input_sel) {
                    if let (Some(name), Some(value)) =
                        (input.value().attr("name"), input.value().attr("value"))
                    {
                        query.append_pair(name, value);
                    }
                }
            }
            trace!(%url, "confirmation from download form");
            return Some(url);
        }
    }

    let token = CONFIRM_TOKEN
        .captures(page)
        .map(|c| c[1].to_string())
        .or_else(|| cookie_token.map(str::to_string))?;
    let url = Url::parse_with_params(
        endpoint,
        &[("export", "download"), ("id", file_id), ("confirm", token.as_str())],
    )
    .ok()?;
    trace!(%url, "confirmation from token");
    Some(url)
}

/// One download attempt: fetch, and follow the confirmation page if served.
pub(crate) async fn download_once(
    client: &Client,
    endpoint: &str,
    file_id: &str,
) -> Result<Vec<u8>, FetchError> {
    let url = download_url(endpoint, file_id)?;
    debug!(%url, "requesting archive");
    let resp = client.get(url).send().await?.error_for_status()?;

    let is_html = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("text/html"))
        .unwrap_or(false);
    if !is_html {
        return Ok(resp.bytes().await?.to_vec());
    }

    let cookie_token = resp
        .cookies()
        .find(|c| c.name().starts_with("download_warning"))
        .map(|c| c.value().to_string());
    let page = resp.text().await?;
    let Some(confirm) = confirmation_url(&page, endpoint, file_id, cookie_token.as_deref()) else {
        return Err(FetchError::NotAnArchive(page.len()));
    };

    debug!(url = %confirm, "following download confirmation");
    let resp = client.get(confirm).send().await?.error_for_status()?;
    Ok(resp.bytes().await?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "1A0yeEBAvLkX64PlatHboPAHhHVIcJICw";

    #[test]
    fn test_extract_file_id() {
        assert_eq!(extract_file_id(ID).unwrap(), ID);
        assert_eq!(
            extract_file_id(&format!("https://drive.google.com/file/d/{ID}/view?usp=sharing")).unwrap(),
            ID
        );
        assert_eq!(
            extract_file_id(&format!("https://drive.google.com/uc?id={ID}&export=download")).unwrap(),
            ID
        );
        assert!(matches!(
            extract_file_id("https://example.com/nothing"),
            Err(FetchError::InvalidFileId(_))
        ));
        assert!(extract_file_id("short").is_err());
    }

    #[test]
    fn test_download_url() {
        let url = download_url(DEFAULT_DOWNLOAD_ENDPOINT, ID).unwrap();
        assert_eq!(url.host_str(), Some("drive.google.com"));
        assert!(url.query_pairs().any(|(k, v)| k == "id" && v == ID));
    }

    #[test]
    fn test_confirmation_from_form() {
        let page = r#"<html><body>
            <form id="download-form" action="https://drive.usercontent.google.com/download" method="get">
              <input type="submit" value="Download anyway"/>
              <input type="hidden" name="id" value="abc123">
              <input type="hidden" name="export" value="download">
              <input type="hidden" name="confirm" value="t">
              <input type="hidden" name="uuid" value="u-1">
            </form></body></html>"#;
        let url = confirmation_url(page, DEFAULT_DOWNLOAD_ENDPOINT, "abc123", None).expect("form url");
        assert_eq!(url.host_str(), Some("drive.usercontent.google.com"));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("confirm".into(), "t".into())));
        assert!(pairs.contains(&("uuid".into(), "u-1".into())));
        assert!(!pairs.iter().any(|(k, _)| k == "Download anyway"));
    }

    #[test]
    fn test_confirmation_from_token_or_cookie() {
        let page = r#"<a href="/uc?export=download&amp;confirm=XyZ_9&amp;id=abc">Download</a>"#;
        let url = confirmation_url(page, DEFAULT_DOWNLOAD_ENDPOINT, "abc", None).expect("token url");
        assert!(url.query_pairs().any(|(k, v)| k == "confirm" && v == "XyZ_9"));

        let url = confirmation_url("<p>warning</p>", DEFAULT_DOWNLOAD_ENDPOINT, "abc", Some("cookie-tok")).expect("cookie url");
        assert!(url.query_pairs().any(|(k, v)| k == "confirm" && v == "cookie-tok"));

        assert!(confirmation_url("<p>quota exceeded</p>", DEFAULT_DOWNLOAD_ENDPOINT, "abc", None).is_none());
    }
}

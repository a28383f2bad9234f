use eyre::{Result, WrapErr};
use serde_json::{json, Value};
use tracing::{debug, warn};

pub const IMAGES_PER_SEARCH: usize = 9;
/// Discord accepts at most ten attachments per message.
pub const ATTACHMENTS_PER_MESSAGE: usize = 10;

const SEARCH_ENDPOINT: &str = "https://www.pinterest.com/resource/BaseSearchResource/get/";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// A downloaded pin image.
#[derive(Debug, Clone)]
pub struct PinImage {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Searches Pinterest's public pin search and fetches the results.
#[derive(Debug, Clone)]
pub struct PinterestClient {
    http: reqwest::Client,
}

impl PinterestClient {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .wrap_err("Failed to build HTTP client")?;
        Ok(Self { http })
    }

    /// Search for `keyword` and download up to `limit` original-size images.
    pub async fn search_images(&self, keyword: &str, limit: usize) -> Result<Vec<PinImage>> {
        let body: Value = self
            .http
            .get(search_url(keyword))
            .header("Accept", "application/json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .wrap_err("Pinterest returned an unexpected response")?;

        let urls = extract_image_urls(&body, limit);
        debug!("Pinterest search for {:?} returned {} images", keyword, urls.len());

        let mut images = Vec::with_capacity(urls.len());
        for (index, url) in urls.iter().enumerate() {
            match self.download(url).await {
                Ok(data) => images.push(PinImage {
                    filename: file_name_from_url(url, index),
                    data,
                }),
                Err(e) => warn!("Skipping pin image {}: {:?}", url, e),
            }
        }

        Ok(images)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let bytes = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }
}

/// Build the search resource URL for a keyword.
pub fn search_url(keyword: &str) -> String {
    let source_url = format!("/search/pins/?q={}", keyword);
    let data = json!({
        "options": {
            "query": keyword,
            "scope": "pins",
        },
        "context": {},
    });

    format!(
        "{}?source_url={}&data={}",
        SEARCH_ENDPOINT,
        urlencoding::encode(&source_url),
        urlencoding::encode(&data.to_string())
    )
}

/// Pull original-size image URLs out of a search response, without repeats.
pub fn extract_image_urls(body: &Value, limit: usize) -> Vec<String> {
    let Some(results) = body
        .pointer("/resource_response/data/results")
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    let mut urls: Vec<String> = Vec::new();
    for pin in results {
        if urls.len() == limit {
            break;
        }
        if let Some(url) = pin.pointer("/images/orig/url").and_then(Value::as_str) {
            if !urls.iter().any(|u| u == url) {
                urls.push(url.to_string());
            }
        }
    }
    urls
}

/// Attachment name for an image: the last path segment of its URL.
pub fn file_name_from_url(url: &str, index: usize) -> String {
    url.split('?')
        .next()
        .and_then(|path| path.rsplit('/').next())
        .filter(|name| !name.is_empty() && name.contains('.'))
        .map(str::to_string)
        .unwrap_or_else(|| format!("pin-{}.jpg", index + 1))
}

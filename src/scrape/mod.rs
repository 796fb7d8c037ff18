//! Page scraping
//!
//! Detects a URL in the user's turn and turns the referenced page into a
//! normalized brand-context summary: title, description meta, readable body
//! text and (best-effort) the page's representative image. Every failure
//! mode collapses to `None` so callers treat "no URL", "fetch failed" and
//! "page unreadable" identically.

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::config::ScrapeConfig;
use crate::types::ImageData;

/// Markup subtrees that carry no brand copy.
const EXCLUDED_ELEMENTS: &[&str] = &["script", "style", "nav", "footer", "iframe", "noscript", "head"];

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

/// Normalized summary of a fetched page.
#[derive(Debug, Clone)]
pub struct ScrapedPage {
    pub url: String,
    pub title: String,
    pub description: String,
    pub text: String,
    pub image_url: Option<String>,
    pub image: Option<ImageData>,
}

impl ScrapedPage {
    /// Render the summary as prompt context for the expert personas.
    pub fn as_prompt_context(&self) -> String {
        let mut context = format!("WEBSITE ANALYSIS ({})\n", self.url);
        if !self.title.is_empty() {
            context.push_str(&format!("Title: {}\n", self.title));
        }
        if !self.description.is_empty() {
            context.push_str(&format!("Description: {}\n", self.description));
        }
        context.push_str(&format!("Page content:\n{}", self.text));
        context
    }
}

/// Injectable fetch seam so the pipeline can be exercised without network.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Option<ScrapedPage>;
}

/// Find the first http/https URL-shaped substring in free text. Handles
/// markdown links, angle brackets, wrapping parens and trailing punctuation.
pub fn detect_url(text: &str) -> Option<Url> {
    for token in text.split_whitespace() {
        if let Some(url) = parse_candidate(token) {
            return Some(url);
        }
    }
    None
}

fn parse_candidate(token: &str) -> Option<Url> {
    // Markdown link: take the target between "](" and ")".
    if let Some(start) = token.find("](") {
        if let Some(end) = token[start..].find(')') {
            return try_parse(&token[start + 2..start + end]);
        }
    }

    let stripped = token
        .strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(token);
    let stripped = stripped
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(stripped);
    try_parse(stripped.trim_end_matches(['.', ',', ';', '!', '?', ')']))
}

fn try_parse(candidate: &str) -> Option<Url> {
    let url = Url::parse(candidate).ok()?;
    match url.scheme() {
        "http" | "https" => Some(url),
        _ => None,
    }
}

/// Metadata and readable text pulled out of an HTML document.
#[derive(Debug, Clone)]
pub struct ParsedPage {
    pub title: String,
    pub description: String,
    pub text: String,
    pub image_url: Option<String>,
}

/// Extract title/description/og:image and the cleaned body text. Pure so it
/// can be tested without a server; truncation to `max_text_len` happens here.
pub fn parse_page(page_url: &Url, html: &str, max_text_len: usize) -> ParsedPage {
    let document = Html::parse_document(html);

    let title = select_text(&document, "title")
        .or_else(|| select_meta(&document, r#"meta[property="og:title"]"#))
        .unwrap_or_default();

    let description = select_meta(&document, r#"meta[name="description"]"#)
        .or_else(|| select_meta(&document, r#"meta[property="og:description"]"#))
        .unwrap_or_default();

    let image_url = select_meta(&document, r#"meta[property="og:image"]"#)
        .or_else(|| select_meta(&document, r#"meta[name="twitter:image"]"#))
        .and_then(|raw| resolve_image_url(page_url, &raw));

    let mut raw_text = String::new();
    collect_text(document.tree.root(), &mut raw_text);
    let mut text = raw_text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.chars().count() > max_text_len {
        text = text.chars().take(max_text_len).collect::<String>() + "...";
    }

    ParsedPage {
        title,
        description,
        text,
        image_url,
    }
}

fn select_text(document: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    let element = document.select(&sel).next()?;
    let text = element.text().collect::<String>().trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn select_meta(document: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    let content = document.select(&sel).next()?.value().attr("content")?;
    let content = content.trim();
    if content.is_empty() {
        None
    } else {
        Some(content.to_string())
    }
}

/// og:image references are frequently relative; resolve against the page.
fn resolve_image_url(page_url: &Url, raw: &str) -> Option<String> {
    if raw.starts_with("http") {
        Some(raw.to_string())
    } else {
        page_url.join(raw).ok().map(|u| u.to_string())
    }
}

fn collect_text(node: ego_tree::NodeRef<'_, scraper::Node>, out: &mut String) {
    match node.value() {
        scraper::Node::Text(text) => {
            out.push_str(&text);
            out.push(' ');
        }
        scraper::Node::Element(element) => {
            if EXCLUDED_ELEMENTS.contains(&element.name()) {
                return;
            }
            for child in node.children() {
                collect_text(child, out);
            }
        }
        _ => {
            for child in node.children() {
                collect_text(child, out);
            }
        }
    }
}

/// Production fetcher: realistic browser identity, bounded timeouts for the
/// page and its representative image independently.
pub struct HttpPageFetcher {
    client: reqwest::Client,
    config: ScrapeConfig,
}

impl HttpPageFetcher {
    pub fn new(config: ScrapeConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    async fn fetch_page(&self, url: &Url) -> Option<ScrapedPage> {
        let response = self
            .client
            .get(url.as_str())
            .timeout(std::time::Duration::from_secs(self.config.page_timeout_secs))
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
            )
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Referer", "https://www.google.com/")
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            debug!(url = %url, status = %response.status(), "page fetch rejected");
            return None;
        }

        let html = response.text().await.ok()?;
        let parsed = parse_page(url, &html, self.config.max_text_len);

        // A near-empty body means a script-rendered or blocked page; analysis
        // built on it would be fabrication, so the whole fetch counts as failed.
        if parsed.text.chars().count() < self.config.min_text_len {
            warn!(
                url = %url,
                text_len = parsed.text.chars().count(),
                "scraped text below minimum, treating page as unreadable"
            );
            return None;
        }

        let image = match &parsed.image_url {
            Some(image_url) => self.fetch_image(image_url).await,
            None => None,
        };

        Some(ScrapedPage {
            url: url.to_string(),
            title: parsed.title,
            description: parsed.description,
            text: parsed.text,
            image_url: parsed.image_url,
            image,
        })
    }

    /// Best-effort: an image failure never fails the augmentation.
    async fn fetch_image(&self, image_url: &str) -> Option<ImageData> {
        let response = self
            .client
            .get(image_url)
            .timeout(std::time::Duration::from_secs(self.config.image_timeout_secs))
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            return None;
        }

        let media_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();

        let bytes = response.bytes().await.ok()?;
        Some(ImageData {
            media_type,
            bytes: bytes.to_vec(),
        })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &Url) -> Option<ScrapedPage> {
        self.fetch_page(url).await
    }
}

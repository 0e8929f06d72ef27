//! `reqwest` + `scraper` browser. Static HTML only; no script execution.

use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::{debug, instrument};

use super::{BrowserAgent, ItemHandle, ListingPage};
use crate::error::{ConfigError, NavigationError};

/// The catalogs' pagination control.
pub const NEXT_PAGE_SELECTOR: &str = "button[aria-label='Go to next page']";

const DEFAULT_USER_AGENT: &str =
  "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub struct HttpBrowser {
  client: reqwest::Client,
  item_selector: Selector,
  next_selector: Selector,
}

impl HttpBrowser {
  pub fn new(item_selector: &str, user_agent: Option<&str>) -> Result<Self, ConfigError> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(30))
      .user_agent(user_agent.unwrap_or(DEFAULT_USER_AGENT))
      .redirect(reqwest::redirect::Policy::limited(5))
      .build()
      .map_err(|e| ConfigError::Invalid {
        name: "HARVEST_USER_AGENT",
        value: e.to_string(),
      })?;
    Ok(Self {
      client,
      item_selector: parse_selector(item_selector)?,
      next_selector: parse_selector(NEXT_PAGE_SELECTOR)?,
    })
  }

  async fn fetch(&self, url: &str) -> Result<String, NavigationError> {
    let response = self.client.get(url).send().await.map_err(|e| nav_error(url, e))?;
    let status = response.status();
    if !status.is_success() {
      return Err(NavigationError::Status {
        url: url.to_string(),
        status: status.as_u16(),
      });
    }
    response.text().await.map_err(|e| nav_error(url, e))
  }
}

fn parse_selector(css: &str) -> Result<Selector, ConfigError> {
  Selector::parse(css).map_err(|e| ConfigError::Invalid {
    name: "selector",
    value: format!("{css}: {e}"),
  })
}

fn nav_error(url: &str, e: reqwest::Error) -> NavigationError {
  if e.is_timeout() {
    NavigationError::Timeout(url.to_string())
  } else {
    NavigationError::Transport {
      url: url.to_string(),
      message: e.to_string(),
    }
  }
}

/// Splits a listing document into item handles. A next-page control that
/// is disabled does not count.
pub fn parse_listing(html: &str, url: &str, item: &Selector, next: &Selector) -> ListingPage {
  let doc = Html::parse_document(html);
  let items = doc
    .select(item)
    .map(|el| ItemHandle::new(el.html(), url))
    .collect();
  let has_next = doc.select(next).any(|el| {
    let attrs = el.value();
    attrs.attr("disabled").is_none() && attrs.attr("aria-disabled") != Some("true")
  });
  ListingPage {
    url: url.to_string(),
    items,
    has_next,
  }
}

#[async_trait]
impl BrowserAgent for HttpBrowser {
  #[instrument(level = "trace", skip(self))]
  async fn open_listing(&self, url: &str) -> Result<ListingPage, NavigationError> {
    let body = self.fetch(url).await?;
    let page = parse_listing(&body, url, &self.item_selector, &self.next_selector);
    debug!(url, items = page.items.len(), has_next = page.has_next, "listing loaded");
    Ok(page)
  }

  #[instrument(level = "trace", skip(self))]
  async fn open_detail(&self, url: &str) -> Result<ItemHandle, NavigationError> {
    let body = self.fetch(url).await?;
    Ok(ItemHandle::new(body, url))
  }
}

//! Browser agent seam: navigates to listing and detail pages.

mod http;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{instrument, warn};

use crate::error::NavigationError;

pub use http::{HttpBrowser, NEXT_PAGE_SELECTOR, parse_listing};

/// Opaque handle to one item: its HTML plus the page it came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemHandle {
  pub html: String,
  pub page_url: String,
}

impl ItemHandle {
  pub fn new(html: impl Into<String>, page_url: impl Into<String>) -> Self {
    Self {
      html: html.into(),
      page_url: page_url.into(),
    }
  }
}

/// One loaded catalog page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListingPage {
  pub url: String,
  pub items: Vec<ItemHandle>,
  pub has_next: bool,
}

#[async_trait]
pub trait BrowserAgent: Send + Sync {
  /// Loads a catalog page and splits it into item handles.
  async fn open_listing(&self, url: &str) -> Result<ListingPage, NavigationError>;

  /// Loads a detail page as a single handle.
  async fn open_detail(&self, url: &str) -> Result<ItemHandle, NavigationError>;
}

/// Fixed-count navigation retry with a constant pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationRetry {
  pub attempts: u32,
  pub pause: Duration,
}

impl Default for NavigationRetry {
  fn default() -> Self {
    Self {
      attempts: 3,
      pause: Duration::from_secs(2),
    }
  }
}

impl NavigationRetry {
  /// Runs `open` until it succeeds or the attempts are spent; returns the
  /// last error on exhaustion.
  #[instrument(level = "trace", skip(self, open))]
  pub async fn run<T, F, Fut>(&self, url: &str, mut open: F) -> Result<T, NavigationError>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, NavigationError>>,
  {
    let attempts = self.attempts.max(1);
    let mut attempt = 1;
    loop {
      match open().await {
        Ok(v) => return Ok(v),
        Err(e) if attempt >= attempts => return Err(e),
        Err(e) => {
          warn!(url, attempt, attempts, error = %e, "navigation failed, retrying");
          tokio::time::sleep(self.pause).await;
          attempt += 1;
        }
      }
    }
  }
}

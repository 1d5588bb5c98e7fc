//! [`NavigationEngine`] backed by a Chrome instance over the DevTools
//! protocol.

use std::path::Path;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Element, Page};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::engine::NavigationEngine;
use crate::error::ScraperError;
use crate::locator::Locator;

#[derive(Debug, Clone, Copy)]
pub struct ChromeOptions {
    pub headless: bool,
    pub page_load_timeout: Duration,
}

impl ChromeOptions {
    #[must_use]
    pub fn from_app_config(config: &rescrawl_core::AppConfig) -> Self {
        Self {
            headless: config.headless,
            page_load_timeout: Duration::from_secs(config.page_load_timeout_secs),
        }
    }
}

pub struct ChromeEngine {
    browser: Mutex<Browser>,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromeEngine {
    /// Start Chrome and open a blank tab.
    ///
    /// # Errors
    ///
    /// [`ScraperError::Engine`] when the browser cannot be launched.
    pub async fn launch(options: ChromeOptions) -> Result<Self, ScraperError> {
        let mut builder = BrowserConfig::builder()
            .window_size(1920, 1080)
            .request_timeout(options.page_load_timeout)
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage");
        if !options.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(ScraperError::Engine)?;

        let (browser, mut events) = Browser::launch(config).await?;
        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let Err(err) = event {
                    tracing::debug!(error = %err, "devtools handler stopped");
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await?;
        tracing::info!(headless = options.headless, "browser launched");
        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler,
        })
    }

    /// Close the browser and wait for the process to exit.
    pub async fn shutdown(self) {
        let mut browser = self.browser.into_inner();
        if let Err(err) = browser.close().await {
            tracing::warn!(error = %err, "browser did not close cleanly");
        }
        if let Err(err) = browser.wait().await {
            tracing::debug!(error = %err, "waiting for browser exit failed");
        }
        self.handler.abort();
    }
}

fn not_found(locator: &Locator) -> ScraperError {
    ScraperError::ElementNotFound {
        locator: locator.to_string(),
    }
}

impl NavigationEngine for ChromeEngine {
    type Element = Element;

    async fn open(&self, url: &str) -> Result<(), ScraperError> {
        self.page.goto(url).await?;
        Ok(())
    }

    async fn find(&self, locator: &Locator) -> Result<Element, ScraperError> {
        let found = match locator {
            Locator::Css(selector) => self.page.find_element(selector.as_str()).await,
            Locator::Xpath(path) => self.page.find_xpath(path.as_str()).await,
        };
        found.map_err(|_| not_found(locator))
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<Element>, ScraperError> {
        let found = match locator {
            Locator::Css(selector) => self.page.find_elements(selector.as_str()).await,
            Locator::Xpath(path) => self.page.find_xpaths(path.as_str()).await,
        };
        Ok(found.unwrap_or_default())
    }

    async fn find_within(
        &self,
        parent: &Element,
        locator: &Locator,
    ) -> Result<Vec<Element>, ScraperError> {
        match locator {
            Locator::Css(selector) => Ok(parent
                .find_elements(selector.as_str())
                .await
                .unwrap_or_default()),
            Locator::Xpath(_) => Err(ScraperError::Engine(format!(
                "nested lookups need a css locator, got {locator}"
            ))),
        }
    }

    async fn click(&self, element: &Element) -> Result<(), ScraperError> {
        element.click().await?;
        Ok(())
    }

    async fn type_text(&self, element: &Element, text: &str) -> Result<(), ScraperError> {
        element
            .call_js_fn("function() { this.value = ''; }", false)
            .await?;
        element.click().await?;
        element.type_str(text).await?;
        Ok(())
    }

    async fn text(&self, element: &Element) -> Result<String, ScraperError> {
        Ok(element.inner_text().await?.unwrap_or_default())
    }

    async fn attribute(&self, element: &Element, name: &str) -> Result<Option<String>, ScraperError> {
        Ok(element.attribute(name).await?)
    }

    async fn current_location(&self) -> Result<String, ScraperError> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn back(&self) -> Result<(), ScraperError> {
        self.page.evaluate("window.history.back()").await?;
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> Result<(), ScraperError> {
        self.page
            .save_screenshot(ScreenshotParams::builder().full_page(true).build(), path)
            .await?;
        Ok(())
    }
}

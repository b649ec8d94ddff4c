//! Headless page rendering capability.
//!
//! The headless fetch modes delegate to a [`PageRenderer`]. The pipeline
//! works without one; those modes are then skipped. With the `headless`
//! feature a Chromium-backed renderer is available.

use async_trait::async_trait;

use crate::error::Result;

/// Renders a URL in a real browser engine and returns the final DOM.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Load `url` and return the serialized document.
    ///
    /// `proxy` is a `socks5h://host:port` URL when the request must be
    /// routed through the anonymizing proxy.
    async fn render_page(&self, url: &str, proxy: Option<&str>) -> Result<String>;
}

#[cfg(feature = "headless")]
pub use chromium::{find_chromium, ChromiumRenderer};

#[cfg(feature = "headless")]
mod chromium {
    use std::path::PathBuf;

    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use futures::StreamExt;

    use super::PageRenderer;
    use crate::error::{Result, SearchError};

    /// Find a Chromium binary: `HERBVIEW_CHROMIUM_PATH` first, then `PATH`.
    pub fn find_chromium() -> Option<PathBuf> {
        if let Ok(p) = std::env::var("HERBVIEW_CHROMIUM_PATH") {
            let path = PathBuf::from(&p);
            if path.exists() {
                return Some(path);
            }
        }

        ["google-chrome", "chromium", "chromium-browser"]
            .iter()
            .find_map(|name| which::which(name).ok())
    }

    /// Launches a short-lived headless Chromium per page.
    ///
    /// A fresh browser per call keeps the renderer stateless and lets each
    /// call choose its own proxy.
    pub struct ChromiumRenderer {
        executable: PathBuf,
    }

    impl ChromiumRenderer {
        pub fn new(executable: PathBuf) -> Self {
            Self { executable }
        }

        /// Locate Chromium on this machine, if installed.
        pub fn discover() -> Option<Self> {
            find_chromium().map(Self::new)
        }
    }

    #[async_trait]
    impl PageRenderer for ChromiumRenderer {
        async fn render_page(&self, url: &str, proxy: Option<&str>) -> Result<String> {
            let mut builder = BrowserConfig::builder()
                .chrome_executable(&self.executable)
                .arg("--headless=new")
                .arg("--disable-gpu")
                .arg("--no-sandbox")
                .arg("--disable-dev-shm-usage")
                .arg("--disable-extensions");
            if let Some(proxy) = proxy {
                // Chromium resolves through SOCKS5 proxies on its own and
                // rejects the socks5h scheme.
                let proxy = proxy.replacen("socks5h://", "socks5://", 1);
                builder = builder.arg(format!("--proxy-server={proxy}"));
            }
            let config = builder
                .build()
                .map_err(|e| SearchError::Network(format!("browser config: {e}")))?;

            let (mut browser, mut handler) = Browser::launch(config)
                .await
                .map_err(|e| SearchError::Network(format!("failed to launch Chromium: {e}")))?;
            let handler_task = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    let _ = event;
                }
            });

            let html = async {
                let page = browser
                    .new_page(url)
                    .await
                    .map_err(|e| SearchError::Network(format!("navigation failed: {e}")))?;
                let _ = page.wait_for_navigation().await;
                page.content()
                    .await
                    .map_err(|e| SearchError::Network(format!("failed to read DOM: {e}")))
            }
            .await;

            let _ = browser.close().await;
            let _ = browser.wait().await;
            handler_task.abort();

            html
        }
    }
}

//! Local Chrome launched through `chromiumoxide`.
//!
//! Used by the CLI and the smoke test to get a real page to resolve against.
//! The runtime owns the browser and its event handler task; pages it opens
//! are handed out as [`ChromiumoxideDriver`]s.

use std::path::PathBuf;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::handler::viewport::Viewport;
use futures_util::StreamExt;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::adapter::ChromiumoxideDriver;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("browser runtime error: {0}")]
    Message(String),
    #[error("browser runtime not initialized")]
    NotInitialized,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LaunchOptions {
    pub chrome_executable: Option<PathBuf>,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub args: Vec<String>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            chrome_executable: None,
            headless: true,
            viewport_width: 1280,
            viewport_height: 800,
            args: Vec::new(),
        }
    }
}

struct RuntimeState {
    browser: Browser,
    handler: JoinHandle<()>,
}

#[derive(Default)]
pub struct ChromiumoxideRuntime {
    state: Mutex<Option<RuntimeState>>,
}

impl ChromiumoxideRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Launch Chrome unless a browser is already running.
    pub async fn launch(&self, options: &LaunchOptions) -> Result<(), RuntimeError> {
        let mut guard = self.state.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        let config = build_config(options)?;
        let (browser, handler) = Browser::launch(config)
            .await
            .map_err(map_chromiumoxide_error)?;

        *guard = Some(RuntimeState {
            browser,
            handler: spawn_handler(handler),
        });
        Ok(())
    }

    /// Open `url` in a new tab.
    pub async fn new_page(&self, url: &str) -> Result<ChromiumoxideDriver, RuntimeError> {
        let guard = self.state.lock().await;
        let state = guard.as_ref().ok_or(RuntimeError::NotInitialized)?;
        let page = state
            .browser
            .new_page(url)
            .await
            .map_err(map_chromiumoxide_error)?;
        Ok(ChromiumoxideDriver::new(page))
    }

    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let state = self.state.lock().await.take();
        if let Some(mut state) = state {
            let closed = state.browser.close().await.map_err(map_chromiumoxide_error);
            if closed.is_ok() {
                let _ = state.browser.wait().await;
            }
            state.handler.abort();
            closed?;
        }
        Ok(())
    }
}

fn build_config(options: &LaunchOptions) -> Result<BrowserConfig, RuntimeError> {
    let viewport = Viewport {
        width: options.viewport_width,
        height: options.viewport_height,
        device_scale_factor: None,
        emulating_mobile: false,
        is_landscape: options.viewport_width >= options.viewport_height,
        has_touch: false,
    };

    let mut builder = BrowserConfig::builder();

    if let Some(path) = &options.chrome_executable {
        builder = builder.chrome_executable(path);
    }

    let builder = builder
        .viewport(viewport)
        .window_size(options.viewport_width, options.viewport_height)
        .args(options.args.clone());

    let builder = if options.headless {
        builder
    } else {
        builder.with_head()
    };

    builder.build().map_err(RuntimeError::Message)
}

fn map_chromiumoxide_error<E: std::fmt::Display>(err: E) -> RuntimeError {
    RuntimeError::Message(err.to_string())
}

fn spawn_handler(mut handler: chromiumoxide::handler::Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(result) = handler.next().await {
            if let Err(err) = result {
                log::warn!(target: "testai", "chromiumoxide handler error: {err}");
            }
        }
    })
}

//! Chromium driver using chromiumoxide

use super::scripts::{action_script, probe_script, read_script, READY_STATE};
use super::{Action, BrowserDriver, DriverError, DriverResult, FrameId, Probe, Read};
use crate::config::BrowserConfig;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpBrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::FrameId as CdpFrameId;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

/// Interval of the liveness check while waiting for the window to close
const LIVENESS_INTERVAL: Duration = Duration::from_secs(2);

/// How long the page may stay unresponsive before the window counts as closed
const DEFAULT_CLOSE_GRACE: Duration = Duration::from_secs(45);

/// Tracks how long the page has been failing liveness checks
///
/// Evaluation fails while a navigation swaps documents, so only failures that
/// persist for the whole grace period mean the window is gone.
#[derive(Debug)]
struct Liveness {
    grace: Duration,
    failing_since: Option<Instant>,
}

impl Liveness {
    fn new(grace: Duration) -> Self {
        Self {
            grace,
            failing_since: None,
        }
    }

    /// Records one check; returns true once the page counts as gone
    fn record(&mut self, answered: bool, now: Instant) -> bool {
        if answered {
            self.failing_since = None;
            return false;
        }
        let since = *self.failing_since.get_or_insert(now);
        now.duration_since(since) >= self.grace
    }
}

/// A Chromium instance with one page, driven over the DevTools protocol
pub struct ChromiumDriver {
    browser: Mutex<Browser>,
    page: Page,
    closed: watch::Receiver<bool>,
    close_grace: Duration,
    _handler: JoinHandle<()>,
}

impl ChromiumDriver {
    /// Launches Chromium and opens a blank page
    pub async fn launch(config: &BrowserConfig) -> DriverResult<Self> {
        let mut builder = CdpBrowserConfig::builder()
            .window_size(config.window_width, config.window_height)
            .arg("--disable-features=VizDisplayCompositor")
            .arg("--disable-dev-shm-usage")
            .no_sandbox();

        if !config.headless {
            builder = builder.with_head().arg("--start-maximized");
        }
        if let Some(executable) = &config.executable {
            builder = builder.chrome_executable(executable);
        }

        let cdp_config = builder.build().map_err(DriverError::Launch)?;

        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| DriverError::Launch(e.to_string()))?;

        let (closed_tx, closed_rx) = watch::channel(false);

        // The handler pumps DevTools messages; it ends when the connection drops
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("DevTools handler event error: {}", e);
                }
            }
            tracing::debug!("DevTools connection closed");
            let _ = closed_tx.send(true);
        });

        let page = browser.new_page("about:blank").await?;

        tracing::info!(
            "Launched Chromium ({})",
            if config.headless { "headless" } else { "windowed" }
        );

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            closed: closed_rx,
            close_grace: DEFAULT_CLOSE_GRACE,
            _handler: handler_task,
        })
    }

    /// Sets how long the page may stay unresponsive before [`BrowserDriver::closed`]
    /// resolves; match it to the navigation timeout
    pub fn with_close_grace(mut self, grace: Duration) -> Self {
        self.close_grace = grace;
        self
    }

    /// Evaluates an expression inside the frame's document
    async fn evaluate_in(&self, frame: &FrameId, expression: String) -> DriverResult<serde_json::Value> {
        let context = self
            .page
            .frame_execution_context(CdpFrameId::new(frame.as_str()))
            .await?
            .ok_or_else(|| DriverError::FrameDetached(frame.clone()))?;

        let params = EvaluateParams::builder()
            .expression(expression)
            .context_id(context)
            .return_by_value(true)
            .await_promise(true)
            .build()
            .map_err(DriverError::Script)?;

        let result = self.page.evaluate_expression(params).await?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn goto(&self, url: &str, timeout: Duration) -> DriverResult<()> {
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(DriverError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(DriverError::Timeout(timeout)),
        }
    }

    async fn wait_for_load(&self, timeout: Duration) -> DriverResult<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let ready = self
                .page
                .evaluate(READY_STATE)
                .await
                .ok()
                .and_then(|v| v.into_value::<bool>().ok())
                .unwrap_or(false);
            if ready {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(DriverError::Timeout(timeout));
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    async fn frames(&self) -> DriverResult<Vec<FrameId>> {
        let main = self.page.mainframe().await?;
        let mut frames: Vec<FrameId> = self
            .page
            .frames()
            .await?
            .into_iter()
            .map(|id| FrameId::new(id.inner().clone()))
            .collect();

        if let Some(main) = main {
            let main = FrameId::new(main.inner().clone());
            frames.retain(|f| *f != main);
            frames.insert(0, main);
        }
        Ok(frames)
    }

    async fn main_frame(&self) -> DriverResult<FrameId> {
        self.page
            .mainframe()
            .await?
            .map(|id| FrameId::new(id.inner().clone()))
            .ok_or(DriverError::Closed)
    }

    async fn current_url(&self) -> DriverResult<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn probe(&self, frame: &FrameId, probe: &Probe) -> DriverResult<bool> {
        let value = self.evaluate_in(frame, probe_script(probe)).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn read(&self, frame: &FrameId, read: &Read) -> DriverResult<serde_json::Value> {
        self.evaluate_in(frame, read_script(read)).await
    }

    async fn perform(&self, frame: &FrameId, action: &Action) -> DriverResult<bool> {
        let value = self.evaluate_in(frame, action_script(action)).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn closed(&self) {
        let mut closed = self.closed.clone();
        let mut liveness = Liveness::new(self.close_grace);
        loop {
            tokio::select! {
                _ = async { let _ = closed.wait_for(|c| *c).await; } => return,
                _ = tokio::time::sleep(LIVENESS_INTERVAL) => {
                    let answered = matches!(
                        tokio::time::timeout(LIVENESS_INTERVAL, self.page.evaluate("1")).await,
                        Ok(Ok(_))
                    );
                    if liveness.record(answered, Instant::now()) {
                        tracing::debug!(
                            "Page has not answered for {:?}, treating window as closed",
                            self.close_grace
                        );
                        return;
                    }
                }
            }
        }
    }

    async fn close(&self) -> DriverResult<()> {
        let mut browser = self.browser.lock().await;
        browser.close().await?;
        let _ = browser.wait().await;
        Ok(())
    }
}

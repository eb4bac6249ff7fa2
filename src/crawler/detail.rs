//! Detail view navigation and extraction

use super::frames::{find_frame_with_selector, first_matching_frame};
use crate::config::{SiteConfig, TimeoutConfig};
use crate::driver::{Action, BrowserDriver, DriverError, ElementState, FrameId, Locator, Probe, Read};
use crate::extract::{extract_record, DetailRecord, DetailSnapshot};
use crate::retry::poll_until;
use crate::{CrawlerError, Result};

/// Number of detail-like links currently in the list frame
pub async fn count_detail_links(driver: &dyn BrowserDriver, list_frame: &FrameId) -> Result<usize> {
    let value = driver.read(list_frame, &Read::DetailLinkCount).await?;
    Ok(serde_json::from_value(value)?)
}

/// Scrolls the n-th detail link into view and activates it
pub async fn open_detail(
    driver: &dyn BrowserDriver,
    list_frame: &FrameId,
    index: usize,
    timeouts: &TimeoutConfig,
) -> Result<()> {
    let click = Action::Click {
        locator: Locator::DetailLink { index },
    };
    if !driver.perform(list_frame, &click).await? {
        return Err(CrawlerError::navigation(format!(
            "detail link #{} is gone",
            index
        )));
    }
    super::settle_after_click(driver, timeouts).await
}

/// Finds the frame of the detail view
///
/// Looks for the back anchor first; if it never shows, scans every frame once
/// for the anchor or the back caption, and settles for the main frame when
/// nothing matches.
pub async fn wait_detail_ready(
    driver: &dyn BrowserDriver,
    site: &SiteConfig,
    timeouts: &TimeoutConfig,
) -> Result<FrameId> {
    let primary = find_frame_with_selector(
        driver,
        &site.back_selector,
        ElementState::Attached,
        timeouts.policy(timeouts.detail_ready),
    )
    .await;

    match primary {
        Ok(frame) => Ok(frame),
        Err(e) => {
            tracing::debug!("{}; scanning frames for '{}'", e, site.back_text);
            let probe = Probe::DetailReady {
                back_selector: site.back_selector.clone(),
                back_text: site.back_text.clone(),
            };
            if let Some(frame) = first_matching_frame(driver, &probe).await {
                return Ok(frame);
            }
            tracing::warn!("No back control found, reading the main frame");
            Ok(driver.main_frame().await?)
        }
    }
}

/// Reads the detail view and applies the field heuristics
///
/// The detail link is the location of the frame the view was read from. The
/// page URL stands in when the frame reports none.
pub async fn extract_detail(
    driver: &dyn BrowserDriver,
    detail_frame: &FrameId,
    sentinel: &str,
) -> Result<DetailRecord> {
    let value = driver.read(detail_frame, &Read::DetailSnapshot).await?;
    let snapshot = DetailSnapshot::from_value(value)?;

    let link = match snapshot.link.as_deref().map(str::trim) {
        Some(link) if !link.is_empty() && link != "about:blank" => link.to_string(),
        _ => driver.current_url().await?,
    };
    tracing::trace!("Snapshot of {}: {:?}", link, snapshot);
    Ok(extract_record(&snapshot, &link, sentinel))
}

/// Returns from the detail view to the list
///
/// Paths, in order: click the back anchor, click the element captioned with
/// the back text, call the page's back function. A path counts only once the
/// view has left the detail page; otherwise the next one is tried.
pub async fn go_back(
    driver: &dyn BrowserDriver,
    detail_frame: &FrameId,
    site: &SiteConfig,
    timeouts: &TimeoutConfig,
) -> Result<()> {
    let paths = [
        Action::Click {
            locator: Locator::css(&site.back_selector),
        },
        Action::Click {
            locator: Locator::text(&site.back_text),
        },
        Action::CallFunction {
            name: site.back_function.clone(),
        },
    ];

    for action in &paths {
        match driver.perform(detail_frame, action).await {
            Ok(true) => {
                super::settle_after_click(driver, timeouts).await?;
                if left_detail(driver, detail_frame, site, timeouts).await {
                    tracing::debug!("Back to list via {:?}", action);
                    return Ok(());
                }
                tracing::warn!("Back path {:?} had no effect", action);
            }
            Ok(false) => {}
            Err(DriverError::Closed) => return Err(DriverError::Closed.into()),
            Err(e) => tracing::debug!("Back path {:?} failed: {}", action, e),
        }
    }

    Err(CrawlerError::navigation("no way back from the detail view"))
}

/// Waits for a result list to show, or for the detail view to lose its back control
async fn left_detail(
    driver: &dyn BrowserDriver,
    detail_frame: &FrameId,
    site: &SiteConfig,
    timeouts: &TimeoutConfig,
) -> bool {
    let detail = Probe::DetailReady {
        back_selector: site.back_selector.clone(),
        back_text: site.back_text.clone(),
    };

    poll_until(timeouts.navigation_check_policy(), || {
        let detail = &detail;
        async move {
            if first_matching_frame(driver, &Probe::ListReady).await.is_some() {
                return Some(());
            }
            // A detached frame has navigated away as well
            match driver.probe(detail_frame, detail).await {
                Ok(true) => None,
                Ok(false) | Err(_) => Some(()),
            }
        }
    })
    .await
    .is_ok()
}

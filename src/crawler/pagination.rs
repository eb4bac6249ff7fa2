//! Result list pagination

use super::frames::{find_frame_matching, first_matching_frame};
use crate::config::TimeoutConfig;
use crate::driver::{Action, BrowserDriver, DriverError, FrameId, Locator, Probe, Read, Role};
use crate::retry::poll_until;
use crate::text::is_page_number;
use crate::{CrawlerError, Result};

/// Page numbers found among anchor captions, ascending and unique
///
/// Only purely numeric captions count. Defaults to `[1]` when there are none.
///
/// ```
/// use listing_crawler::crawler::pagination::page_indices;
///
/// assert_eq!(page_indices(["3", "1", "2", "1"]), vec![1, 2, 3]);
/// assert_eq!(page_indices(["Próxima"]), vec![1]);
/// ```
pub fn page_indices<I, S>(captions: I) -> Vec<u32>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut indices: Vec<u32> = captions
        .into_iter()
        .filter(|c| is_page_number(c.as_ref()))
        .filter_map(|c| c.as_ref().trim().parse().ok())
        .collect();
    indices.sort_unstable();
    indices.dedup();

    if indices.is_empty() {
        indices.push(1);
    }
    indices
}

/// Waits until some frame shows at least one detail-like link
///
/// Returns the list frame. Call it again after every navigation: the frame it
/// returned before may be gone.
pub async fn wait_list_ready(driver: &dyn BrowserDriver, timeouts: &TimeoutConfig) -> Result<FrameId> {
    find_frame_matching(
        driver,
        &Probe::ListReady,
        timeouts.policy(timeouts.list_ready),
        "the result list",
    )
    .await
}

/// Collects the page numbers linked from every frame of the page
pub async fn collect_page_indices(driver: &dyn BrowserDriver) -> Result<Vec<u32>> {
    let mut captions = Vec::new();

    for frame in driver.frames().await? {
        match driver.read(&frame, &Read::PageAnchors).await {
            Ok(value) => {
                let anchors: Vec<String> = serde_json::from_value(value)?;
                captions.extend(anchors);
            }
            Err(e) => tracing::trace!("Reading anchors of frame {} failed: {}", frame, e),
        }
    }

    let indices = page_indices(&captions);
    tracing::info!("Result pages: {:?}", indices);
    Ok(indices)
}

/// Clicks the page number in the list frame and waits for the new list
///
/// Tries the link with that exact name first, then any element whose text is
/// exactly the number. A click counts only once a list with different content
/// shows; otherwise the next candidate is tried.
pub async fn goto_page(
    driver: &dyn BrowserDriver,
    list_frame: &FrameId,
    page: u32,
    timeouts: &TimeoutConfig,
) -> Result<FrameId> {
    let caption = page.to_string();
    let candidates = [
        Locator::Role {
            role: Role::Link,
            name: caption.clone(),
        },
        Locator::text(&caption),
    ];

    let before = list_fingerprint(driver, list_frame).await;

    for locator in candidates {
        let label = locator.to_string();
        match driver.perform(list_frame, &Action::Click { locator }).await {
            Ok(true) => {
                tracing::info!("Moving to result page {}", page);
                tracing::debug!("Clicked {}", label);
                super::settle_after_click(driver, timeouts).await?;
                if let Some(frame) = wait_new_list(driver, before.as_deref(), timeouts).await {
                    return Ok(frame);
                }
                tracing::warn!("Clicking {} did not change the list", label);
            }
            Ok(false) => {}
            Err(DriverError::Closed) => return Err(DriverError::Closed.into()),
            Err(e) => tracing::debug!("Clicking {} failed: {}", label, e),
        }
    }

    Err(CrawlerError::navigation(format!(
        "no link to result page {}",
        page
    )))
}

async fn list_fingerprint(driver: &dyn BrowserDriver, frame: &FrameId) -> Option<String> {
    match driver.read(frame, &Read::ListFingerprint).await {
        Ok(serde_json::Value::String(fingerprint)) => Some(fingerprint),
        Ok(other) => {
            tracing::trace!("Unexpected list fingerprint {:?}", other);
            None
        }
        Err(e) => {
            tracing::trace!("Reading list fingerprint failed: {}", e);
            None
        }
    }
}

/// Waits for a list frame whose fingerprint differs from `before`
///
/// Without a previous fingerprint any ready list is accepted.
async fn wait_new_list(
    driver: &dyn BrowserDriver,
    before: Option<&str>,
    timeouts: &TimeoutConfig,
) -> Option<FrameId> {
    poll_until(timeouts.navigation_check_policy(), || async move {
        let frame = first_matching_frame(driver, &Probe::ListReady).await?;
        let Some(before) = before else {
            return Some(frame);
        };
        let now = list_fingerprint(driver, &frame).await?;
        (now != before).then_some(frame)
    })
    .await
    .ok()
}

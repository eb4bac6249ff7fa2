//! Frame resolution
//!
//! Frames are looked up by capability ("has selector X", "offers option Y")
//! every time they are needed. A resolved [`FrameId`] is only trusted until the
//! next navigation.

use crate::driver::{BrowserDriver, ElementState, FrameId, Probe};
use crate::retry::{poll_until, PollPolicy};
use crate::{CrawlerError, Result};

/// Polls every frame of the page until one satisfies the probe
///
/// Frames are tried main frame first. A frame that errors (detached mid-scan,
/// cross-origin, still loading) counts as not matching.
pub async fn find_frame_matching(
    driver: &dyn BrowserDriver,
    probe: &Probe,
    policy: PollPolicy,
    what: &str,
) -> Result<FrameId> {
    let found = poll_until(policy, || async move { first_matching_frame(driver, probe).await }).await;

    match found {
        Ok(frame) => {
            tracing::debug!("Resolved frame {} for {}", frame, what);
            Ok(frame)
        }
        Err(elapsed) => {
            tracing::debug!(
                "No frame offered {} after {} attempts",
                what,
                elapsed.attempts
            );
            Err(CrawlerError::timeout(what, elapsed.waited))
        }
    }
}

/// Finds the frame where the selector exists and reached the state
pub async fn find_frame_with_selector(
    driver: &dyn BrowserDriver,
    css: &str,
    state: ElementState,
    policy: PollPolicy,
) -> Result<FrameId> {
    let probe = Probe::Selector {
        css: css.to_string(),
        state,
    };
    find_frame_matching(driver, &probe, policy, &format!("selector `{}`", css)).await
}

/// Finds the frame holding a select that offers the option
///
/// Each attempt scans the top-level frames for a select with the option. When
/// none does but the option is visible somewhere in the main document's tree
/// (a same-origin nested frame the scan did not reach), the main frame is
/// returned.
pub async fn find_frame_with_option(
    driver: &dyn BrowserDriver,
    option: &str,
    policy: PollPolicy,
) -> Result<FrameId> {
    let in_frame = Probe::OptionInFrame {
        option: option.to_string(),
    };
    let in_tree = Probe::OptionInTree {
        option: option.to_string(),
    };

    let found = poll_until(policy, || {
        let in_frame = &in_frame;
        let in_tree = &in_tree;
        async move {
            if let Some(frame) = first_matching_frame(driver, in_frame).await {
                return Some(frame);
            }
            let main = driver.main_frame().await.ok()?;
            match driver.probe(&main, in_tree).await {
                Ok(true) => {
                    tracing::debug!("Option '{}' only visible from the main tree", option);
                    Some(main)
                }
                _ => None,
            }
        }
    })
    .await;

    found.map_err(|elapsed| {
        CrawlerError::timeout(format!("a select offering '{}'", option), elapsed.waited)
    })
}

/// One pass over the page's frames
pub(crate) async fn first_matching_frame(
    driver: &dyn BrowserDriver,
    probe: &Probe,
) -> Option<FrameId> {
    let frames = match driver.frames().await {
        Ok(frames) => frames,
        Err(e) => {
            tracing::trace!("Listing frames failed: {}", e);
            return None;
        }
    };

    for frame in frames {
        match driver.probe(&frame, probe).await {
            Ok(true) => return Some(frame),
            Ok(false) => {}
            Err(e) => tracing::trace!("Probe failed in frame {}: {}", frame, e),
        }
    }
    None
}

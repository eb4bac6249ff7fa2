//! Two-stage search form
//!
//! Stage 1 selects the location, stage 2 the property type and price band.
//! Each stage sets its named fields by visible option text, forces every other
//! "any"-capable select to the any option, and submits. Every field actually
//! applied is recorded in the [`SearchSession`].

use super::frames::{find_frame_with_option, find_frame_with_selector, first_matching_frame};
use crate::config::Config;
use crate::driver::{Action, BrowserDriver, ElementState, FrameId, Locator, Probe, Read, Role};
use crate::retry::poll_until;
use crate::state::{FormField, FormStage, SearchSession};
use crate::text::normalize_label;
use crate::{CrawlerError, Result};

/// Drives the search form until the result list is submitted
pub struct FormSequencer<'a> {
    driver: &'a dyn BrowserDriver,
    config: &'a Config,
}

impl<'a> FormSequencer<'a> {
    pub fn new(driver: &'a dyn BrowserDriver, config: &'a Config) -> Self {
        Self { driver, config }
    }

    /// Runs the remaining stages of the session
    pub async fn run(&self, session: &mut SearchSession) -> Result<()> {
        while !session.stage().is_terminal() {
            match session.stage() {
                FormStage::Stage1 => self.run_stage_one(session).await?,
                FormStage::Stage2 => self.run_stage_two(session).await?,
                FormStage::ResultsReady => break,
            }
            session.advance();
            tracing::info!("Form reached {}", session.stage());
        }
        Ok(())
    }

    /// Location stage: state, city, checkboxes
    pub async fn run_stage_one(&self, session: &mut SearchSession) -> Result<()> {
        let search = &self.config.search;
        let timeouts = &self.config.timeouts;

        let frame = find_frame_with_selector(
            self.driver,
            "select",
            ElementState::Visible,
            timeouts.policy(timeouts.frame),
        )
        .await?;
        tracing::info!("Stage 1 form found in frame {}", frame);

        let state = self
            .select_by_option(&frame, FormField::by_option("state", &search.state), &search.state)
            .await?;
        session.record_filter(state.clone());

        // The city list is filled in after the state changes
        let city = self
            .select_by_option(&frame, FormField::by_option("city", &search.city), &search.city)
            .await?;
        session.record_filter(city.clone());

        // Reset listeners may redraw the checkboxes, so they come last
        self.reset_others(&frame, vec![state.locator, city.locator])
            .await?;

        if search.mark_all_checkboxes {
            let boxes_frame = find_frame_with_selector(
                self.driver,
                "input[type='checkbox']",
                ElementState::Attached,
                timeouts.policy(timeouts.frame),
            )
            .await?;
            self.driver
                .perform(&boxes_frame, &Action::CheckAllCheckboxes)
                .await?;
            tracing::debug!("Checked every checkbox in frame {}", boxes_frame);
        }

        self.click_next(&frame).await
    }

    /// Type and price band stage
    pub async fn run_stage_two(&self, session: &mut SearchSession) -> Result<()> {
        let search = &self.config.search;

        let frame = self.find_stage_two_frame().await?;
        tracing::info!("Stage 2 form found in frame {}", frame);

        let property_type = self.apply_type(&frame).await?;

        let price = &search.price_band;
        self.reset_others(
            &frame,
            vec![
                property_type.locator.clone(),
                Locator::css(&price.selector),
                Locator::select_with_option(&price.option_text),
            ],
        )
        .await?;

        let band = self.apply_price_band(&frame).await?;
        session.record_filter(band);

        // The reset pass and change listeners may have touched the type
        let property_type = self.apply_type(&frame).await?;
        self.verify_selected(&frame, &property_type, &search.property_type)
            .await?;
        session.record_filter(property_type);

        self.click_next(&frame).await
    }

    /// Selects the option on the field, waiting for a select to offer it
    async fn select_by_option(
        &self,
        frame: &FrameId,
        field: FormField,
        option: &str,
    ) -> Result<FormField> {
        let timeouts = &self.config.timeouts;
        let action = Action::SelectByText {
            select: field.locator.clone(),
            text: option.to_string(),
        };

        poll_until(timeouts.policy(timeouts.option), || {
            let action = &action;
            async move { matches!(self.driver.perform(frame, action).await, Ok(true)).then_some(()) }
        })
        .await
        .map_err(|elapsed| {
            CrawlerError::timeout(format!("{} option '{}'", field.name, option), elapsed.waited)
        })?;

        Ok(field.applied(frame, option))
    }

    /// Locates stage 2 by its type option, else by the named type select
    async fn find_stage_two_frame(&self) -> Result<FrameId> {
        let search = &self.config.search;
        let timeouts = &self.config.timeouts;

        match find_frame_with_option(
            self.driver,
            &search.property_type,
            timeouts.policy(timeouts.stage_two),
        )
        .await
        {
            Ok(frame) => Ok(frame),
            Err(e) => {
                tracing::warn!("{}; looking for `{}`", e, search.property_type_selector);
                find_frame_with_selector(
                    self.driver,
                    &search.property_type_selector,
                    ElementState::Attached,
                    timeouts.policy(timeouts.frame),
                )
                .await
                .map_err(|_| e)
            }
        }
    }

    /// Sets the property type, falling back to the named type select
    ///
    /// The fallback accepts an option whose caption contains the type, and
    /// the field then expects that caption on read-back.
    async fn apply_type(&self, frame: &FrameId) -> Result<FormField> {
        let search = &self.config.search;
        let primary = FormField::by_option("type", &search.property_type);

        if self.try_select(frame, &primary.locator, &search.property_type).await? {
            return Ok(primary.applied(frame, &search.property_type));
        }

        tracing::warn!(
            "Type option match failed, trying `{}`",
            search.property_type_selector
        );
        let fallback = FormField::by_css("type", &search.property_type_selector)
            .with_matcher(&search.property_type);
        let partial = Action::SelectByPartialText {
            select: fallback.locator.clone(),
            text: search.property_type.clone(),
        };
        if self.driver.perform(frame, &partial).await? {
            let caption = self.selected_text(frame, &fallback.locator).await?;
            return Ok(fallback.with_matcher(&caption).applied(frame, caption));
        }

        // Leave the final word to the read-back check
        Ok(primary)
    }

    /// Sets the price band by value on the named control, else by option text
    async fn apply_price_band(&self, frame: &FrameId) -> Result<FormField> {
        let band = &self.config.search.price_band;
        let timeouts = &self.config.timeouts;

        let named = Probe::Exists {
            locator: Locator::css(&band.selector),
        };
        if self.driver.probe(frame, &named).await? {
            let field = FormField::by_css("price band", &band.selector);
            if !band.value.is_empty() {
                let by_value = Action::SelectByValue {
                    select: field.locator.clone(),
                    value: band.value.clone(),
                };
                if self.driver.perform(frame, &by_value).await? {
                    return Ok(field.applied(frame, &band.value));
                }
            }
            if !band.option_text.is_empty()
                && self.try_select(frame, &field.locator, &band.option_text).await?
            {
                return Ok(field.applied(frame, &band.option_text));
            }
            return Err(CrawlerError::ValidationMismatch {
                field: "price band".to_string(),
                expected: band.value.clone(),
                actual: "no such option".to_string(),
            });
        }

        let option_frame = find_frame_with_option(
            self.driver,
            &band.option_text,
            timeouts.policy(timeouts.price_band),
        )
        .await?;
        let field = FormField::by_option("price band", &band.option_text);
        self.select_by_option(&option_frame, field, &band.option_text)
            .await
    }

    async fn try_select(&self, frame: &FrameId, select: &Locator, text: &str) -> Result<bool> {
        let action = Action::SelectByText {
            select: select.clone(),
            text: text.to_string(),
        };
        Ok(self.driver.perform(frame, &action).await?)
    }

    /// Forces every other select offering the any option to it
    async fn reset_others(&self, frame: &FrameId, except: Vec<Locator>) -> Result<()> {
        let action = Action::ResetSelects {
            option: self.config.search.any_option.clone(),
            except,
        };
        let changed = self.driver.perform(frame, &action).await?;
        tracing::debug!(
            "Reset to '{}' in frame {}: {}",
            self.config.search.any_option,
            frame,
            if changed { "done" } else { "nothing to reset" }
        );
        Ok(())
    }

    /// Reads back the selected caption and compares it to the intended one
    async fn verify_selected(&self, frame: &FrameId, field: &FormField, expected: &str) -> Result<()> {
        let actual = self.selected_text(frame, &field.locator).await?;
        let actual = actual.as_str();

        let matches = if field.option_matchers.is_empty() {
            normalize_label(actual) == normalize_label(expected)
        } else {
            field.matches(actual)
        };
        if !matches {
            return Err(CrawlerError::ValidationMismatch {
                field: field.name.clone(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
        tracing::debug!("{} reads back '{}'", field.name, actual);
        Ok(())
    }

    async fn selected_text(&self, frame: &FrameId, select: &Locator) -> Result<String> {
        let value = self
            .driver
            .read(
                frame,
                &Read::SelectedText {
                    locator: select.clone(),
                },
            )
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// Submits the stage: captioned submit control, then a button by role
    async fn click_next(&self, frame: &FrameId) -> Result<()> {
        let caption = &self.config.search.next_caption;
        let candidates = [
            Locator::Submit {
                caption: caption.clone(),
            },
            Locator::Role {
                role: Role::Button,
                name: caption.clone(),
            },
        ];

        for locator in &candidates {
            let click = Action::Click {
                locator: locator.clone(),
            };
            if self.driver.perform(frame, &click).await? {
                tracing::debug!("Clicked {}", locator);
                return self.settle().await;
            }
        }

        // The control may sit in a sibling frame
        for locator in candidates {
            let exists = Probe::Exists {
                locator: locator.clone(),
            };
            if let Some(other) = first_matching_frame(self.driver, &exists).await {
                if self
                    .driver
                    .perform(&other, &Action::Click { locator })
                    .await?
                {
                    tracing::debug!("Clicked '{}' in frame {}", caption, other);
                    return self.settle().await;
                }
            }
        }

        Err(CrawlerError::navigation(format!(
            "no '{}' control to submit the form",
            caption
        )))
    }

    async fn settle(&self) -> Result<()> {
        super::settle_after_click(self.driver, &self.config.timeouts).await
    }
}

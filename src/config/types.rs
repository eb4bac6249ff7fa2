use crate::retry::PollPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure for the listing crawler
///
/// Every section has defaults, so an empty file (or no file at all) yields a
/// configuration that crawls the default search.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub browser: BrowserConfig,
    pub site: SiteConfig,
    pub search: SearchConfig,
    pub timeouts: TimeoutConfig,
    pub output: OutputConfig,
}

/// Browser launch configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BrowserConfig {
    /// Run without a visible window
    pub headless: bool,

    /// Explicit Chrome/Chromium binary; looked up on PATH when unset
    pub executable: Option<String>,

    /// Window width in pixels
    pub window_width: u32,

    /// Window height in pixels
    pub window_height: u32,

    /// Keep the window open after export until the user closes it
    pub keep_open: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            executable: None,
            window_width: 1366,
            window_height: 900,
            keep_open: true,
        }
    }
}

/// Target site configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SiteConfig {
    /// URL of the first form stage
    pub target_url: String,

    /// Selector of the script-driven "return to list" anchor on detail views
    pub back_selector: String,

    /// Exact caption of the back control, used when the selector misses
    pub back_text: String,

    /// Page function invoked as a last resort to return to the list
    pub back_function: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            target_url: "https://venda-imoveis.caixa.gov.br/sistema/busca-imovel.asp?sltTipoBusca=imoveis"
                .to_string(),
            back_selector: "a[href^='javascript:Retornar']".to_string(),
            back_text: "Voltar".to_string(),
            back_function: "Retornar".to_string(),
        }
    }
}

/// Filters applied by the two form stages
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SearchConfig {
    /// State option text (stage 1)
    pub state: String,

    /// City option text (stage 1)
    pub city: String,

    /// Click every enabled checkbox of stage 1
    pub mark_all_checkboxes: bool,

    /// Property type option text (stage 2)
    pub property_type: String,

    /// Fallback select for the property type when option matching fails
    pub property_type_selector: String,

    /// Option text every unnamed select is reset to
    pub any_option: String,

    /// Caption of the submit control that advances a stage
    pub next_caption: String,

    pub price_band: PriceBandConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            state: "MG".to_string(),
            city: "BELO HORIZONTE".to_string(),
            mark_all_checkboxes: true,
            property_type: "APARTAMENTO".to_string(),
            property_type_selector: "select[name='sltTipoImovel']".to_string(),
            any_option: "INDIFERENTE".to_string(),
            next_caption: "Próximo".to_string(),
            price_band: PriceBandConfig::default(),
        }
    }
}

/// Price band selection: fixed value on a named control, or option text
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PriceBandConfig {
    /// Selector of the price band control
    pub selector: String,

    /// Preferred option value when the control exists
    pub value: String,

    /// Option text used when the named control is missing
    pub option_text: String,
}

impl Default for PriceBandConfig {
    fn default() -> Self {
        Self {
            selector: "select[name='cmb_faixa_vlr'], #cmb_faixa_vlr".to_string(),
            value: "3".to_string(),
            option_text: "DE R$200.000,01 ATÉ R$400.000,00".to_string(),
        }
    }
}

/// Bounds for every suspension point, in milliseconds
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TimeoutConfig {
    /// Interval between two polls of a condition
    pub poll_interval: u64,

    /// Page navigation
    pub navigation: u64,

    /// Locating the frame of a form stage
    pub frame: u64,

    /// Locating a select that offers a given option
    pub option: u64,

    /// Locating the stage 2 frame by its type option
    pub stage_two: u64,

    /// Locating the price band select by option text
    pub price_band: u64,

    /// Result list readiness
    pub list_ready: u64,

    /// Detail view readiness
    pub detail_ready: u64,

    /// Pause after a click that starts a navigation, before readiness polling
    pub settle: u64,

    /// Bound for confirming that a back or page click actually navigated
    pub navigation_check: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            poll_interval: 500,
            navigation: 45_000,
            frame: 20_000,
            option: 20_000,
            stage_two: 25_000,
            price_band: 12_000,
            list_ready: 15_000,
            detail_ready: 15_000,
            settle: 1_000,
            navigation_check: 10_000,
        }
    }
}

impl TimeoutConfig {
    /// Poll policy bounded by the given timeout, at the configured interval
    pub fn policy(&self, timeout_ms: u64) -> PollPolicy {
        PollPolicy::from_millis(self.poll_interval, timeout_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation)
    }

    /// Poll policy for confirming a navigation took effect
    pub fn navigation_check_policy(&self) -> PollPolicy {
        self.policy(self.navigation_check)
    }

    pub fn settle_pause(&self) -> Duration {
        Duration::from_millis(self.settle)
    }
}

/// What to do with collected records when the run aborts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AbortPolicy {
    /// Export whatever was collected before the failure
    Export,

    /// Drop the partial collection
    Discard,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path of the exported table
    pub path: String,

    /// Column delimiter
    pub delimiter: char,

    /// Value written for fields no heuristic could fill
    pub sentinel: String,

    /// Handling of partial results on fatal abort
    pub on_abort: AbortPolicy,

    /// Prefix the file with a UTF-8 byte order mark for spreadsheet tools
    pub bom: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "resultados.csv".to_string(),
            delimiter: ';',
            sentinel: "not found".to_string(),
            on_abort: AbortPolicy::Export,
            bom: false,
        }
    }
}

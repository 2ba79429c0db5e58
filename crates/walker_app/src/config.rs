//! Settings resolution: defaults, then the optional RON file, then flags.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{ensure, Context as _, Result};
use serde::Deserialize;
use url::Url;
use walker_engine::{default_next_page_candidates, Timing, WalkerSettings, WebDriverSettings};

use crate::cli::Cli;

const DEFAULT_OUTPUT: &str = "cid10.csv";
const DEFAULT_CHECKPOINT: &str = "cid10.checkpoint.json";

/// Everything one run needs, fully resolved.
#[derive(Debug, Clone)]
pub(crate) struct RunConfig {
    pub walker: WalkerSettings,
    pub webdriver: WebDriverSettings,
    pub output: PathBuf,
    pub checkpoint: PathBuf,
}

/// Timing overrides, all in milliseconds.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct TimingFile {
    wait_short_ms: Option<u64>,
    wait_long_ms: Option<u64>,
    poll_interval_ms: Option<u64>,
    post_click_ms: Option<u64>,
    backoff_step_ms: Option<u64>,
    jitter_max_ms: Option<u64>,
    retry_penalty_ms: Option<u64>,
    retry_penalty_step_ms: Option<u64>,
    change_poll_iterations: Option<u32>,
    detail_poll_budget_ms: Option<u64>,
    last_resort_wait_ms: Option<u64>,
    between_categories_ms: Option<u64>,
    between_pages_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    start_url: Option<String>,
    output: Option<PathBuf>,
    checkpoint: Option<PathBuf>,
    webdriver: Option<String>,
    headless: Option<bool>,
    window_size: Option<(u32, u32)>,
    browser_args: Vec<String>,
    table_id: Option<String>,
    row_selector: Option<String>,
    min_columns: Option<usize>,
    action_column: Option<usize>,
    back_control_id: Option<String>,
    detail_table_id: Option<String>,
    page_size_selector: Option<String>,
    page_size: Option<String>,
    detail_click_attempts: Option<u32>,
    back_click_attempts: Option<u32>,
    timing: TimingFile,
}

pub(crate) fn resolve(cli: &Cli) -> Result<RunConfig> {
    let file = match &cli.config {
        Some(path) => load_file(path)?,
        None => ConfigFile::default(),
    };
    merge(file, cli)
}

fn load_file(path: &Path) -> Result<ConfigFile> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("could not read config file {}", path.display()))?;
    ron::from_str(&text).with_context(|| format!("invalid config file {}", path.display()))
}

fn merge(file: ConfigFile, cli: &Cli) -> Result<RunConfig> {
    let mut walker = WalkerSettings::default();
    let mut webdriver = WebDriverSettings::default();

    set(&mut walker.start_url, cli.start_url.clone().or(file.start_url));
    if let Some(table_id) = file.table_id {
        walker.next_page_candidates = default_next_page_candidates(&table_id);
        walker.row_selector = format!("#{table_id} > tbody > tr");
        walker.page_size_selector = format!("#{table_id}_length > label > select");
        walker.table_id = table_id;
    }
    set(&mut walker.row_selector, file.row_selector);
    set(&mut walker.min_columns, file.min_columns);
    set(&mut walker.action_column, file.action_column);
    set(&mut walker.back_control_id, file.back_control_id);
    set(&mut walker.detail_table_id, file.detail_table_id);
    set(&mut walker.page_size_selector, file.page_size_selector);
    if let Some(size) = cli.page_size.clone().or(file.page_size) {
        // An empty size keeps whatever the table starts with.
        walker.page_size = (!size.trim().is_empty()).then_some(size);
    }
    set(&mut walker.detail_click_attempts, file.detail_click_attempts);
    set(&mut walker.back_click_attempts, file.back_click_attempts);
    apply_timing(&mut walker.timing, file.timing);

    set(&mut webdriver.webdriver_url, cli.webdriver.clone().or(file.webdriver));
    set(&mut webdriver.headless, file.headless);
    if cli.headed {
        webdriver.headless = false;
    }
    set(&mut webdriver.window_size, file.window_size);
    webdriver.extra_args = file.browser_args;

    check_http_url("start URL", &walker.start_url)?;
    check_http_url("WebDriver URL", &webdriver.webdriver_url)?;
    ensure!(walker.min_columns >= 2, "min_columns must be at least 2");
    ensure!(walker.action_column >= 1, "action_column is 1-based");
    ensure!(
        walker.detail_click_attempts >= 1 && walker.back_click_attempts >= 1,
        "click attempts must be at least 1"
    );

    Ok(RunConfig {
        walker,
        webdriver,
        output: cli
            .output
            .clone()
            .or(file.output)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
        checkpoint: cli
            .checkpoint
            .clone()
            .or(file.checkpoint)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CHECKPOINT)),
    })
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn set_ms(slot: &mut Duration, millis: Option<u64>) {
    set(slot, millis.map(Duration::from_millis));
}

fn apply_timing(timing: &mut Timing, file: TimingFile) {
    set_ms(&mut timing.wait_short, file.wait_short_ms);
    set_ms(&mut timing.wait_long, file.wait_long_ms);
    set_ms(&mut timing.poll_interval, file.poll_interval_ms);
    set_ms(&mut timing.post_click, file.post_click_ms);
    set_ms(&mut timing.backoff_step, file.backoff_step_ms);
    set_ms(&mut timing.jitter_max, file.jitter_max_ms);
    set_ms(&mut timing.retry_penalty, file.retry_penalty_ms);
    set_ms(&mut timing.retry_penalty_step, file.retry_penalty_step_ms);
    set(&mut timing.change_poll_iterations, file.change_poll_iterations);
    set_ms(&mut timing.detail_poll_budget, file.detail_poll_budget_ms);
    set_ms(&mut timing.last_resort_wait, file.last_resort_wait_ms);
    set_ms(&mut timing.between_categories, file.between_categories_ms);
    set_ms(&mut timing.between_pages, file.between_pages_ms);
}

fn check_http_url(what: &str, value: &str) -> Result<()> {
    let url = Url::parse(value).with_context(|| format!("{what} {value:?} is not a URL"))?;
    ensure!(
        matches!(url.scheme(), "http" | "https"),
        "{what} {value:?} must use http or https"
    );
    Ok(())
}

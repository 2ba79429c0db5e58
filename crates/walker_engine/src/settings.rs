use std::time::Duration;

use crate::source::Locator;

/// Timing knobs for waits, polls and click retries.
#[derive(Debug, Clone)]
pub struct Timing {
    /// Budget for optional controls such as the cookie prompt.
    pub wait_short: Duration,
    /// Budget for page/table loads and click confirmations.
    pub wait_long: Duration,
    pub poll_interval: Duration,
    /// Settle time after a click, before checking its effect.
    pub post_click: Duration,
    /// Added to the settle time per failed attempt.
    pub backoff_step: Duration,
    pub jitter_max: Duration,
    pub retry_penalty: Duration,
    pub retry_penalty_step: Duration,
    /// Iteration cap of the pagination and page-size change polls.
    pub change_poll_iterations: u32,
    /// How long to wait for detail rows to render.
    pub detail_poll_budget: Duration,
    /// Confirmation budget of the final forced click.
    pub last_resort_wait: Duration,
    pub between_categories: Duration,
    pub between_pages: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            wait_short: Duration::from_secs(10),
            wait_long: Duration::from_secs(60),
            poll_interval: Duration::from_millis(250),
            post_click: Duration::from_millis(350),
            backoff_step: Duration::from_millis(250),
            jitter_max: Duration::from_millis(150),
            retry_penalty: Duration::from_millis(400),
            retry_penalty_step: Duration::from_millis(200),
            change_poll_iterations: 60,
            detail_poll_budget: Duration::from_secs(8),
            last_resort_wait: Duration::from_secs(60),
            between_categories: Duration::from_millis(300),
            between_pages: Duration::from_millis(500),
        }
    }
}

/// Target-site contract and behaviour of one traversal.
#[derive(Debug, Clone)]
pub struct WalkerSettings {
    pub start_url: String,
    pub table_id: String,
    pub row_selector: String,
    /// Rows with fewer cells are skipped.
    pub min_columns: usize,
    /// 1-based column holding the per-row action control.
    pub action_column: usize,
    pub back_control_id: String,
    pub detail_table_id: String,
    pub page_size_selector: String,
    /// `None` keeps whatever page size the table starts with.
    pub page_size: Option<String>,
    pub cookie_prompt: Option<Locator>,
    /// Next-page controls, highest priority first.
    pub next_page_candidates: Vec<Locator>,
    pub detail_click_attempts: u32,
    pub back_click_attempts: u32,
    pub timing: Timing,
}

impl Default for WalkerSettings {
    fn default() -> Self {
        Self {
            start_url: "https://www.cremesp.org.br/?siteAcao=cid10".to_string(),
            table_id: "tbCategorias".to_string(),
            row_selector: "#tbCategorias > tbody > tr".to_string(),
            min_columns: 3,
            action_column: 3,
            back_control_id: "btnVoltarTbListCategorias".to_string(),
            detail_table_id: "tabela_body".to_string(),
            page_size_selector: "#tbCategorias_length > label > select".to_string(),
            page_size: Some("100".to_string()),
            cookie_prompt: Some(Locator::xpath(
                "//button[contains(., 'Ciente') or contains(., 'OK')]",
            )),
            next_page_candidates: default_next_page_candidates("tbCategorias"),
            detail_click_attempts: 3,
            back_click_attempts: 2,
            timing: Timing::default(),
        }
    }
}

/// The DataTables "next" control of `table_id`, then generic patterns
/// matching "next"/"próxima" text, aria-labels and pagination classes.
pub fn default_next_page_candidates(table_id: &str) -> Vec<Locator> {
    vec![
        Locator::css(format!("#{table_id}_next")),
        Locator::xpath(
            "//a[contains(., 'Próxima') or contains(., 'Proxima') or contains(., 'Next')]",
        ),
        Locator::xpath(
            "//button[contains(., 'Próxima') or contains(., 'Proxima') or contains(., 'Next')]",
        ),
        Locator::css(
            "[aria-label='Próxima página'], [aria-label='Proxima página'], [aria-label='Next']",
        ),
        Locator::css(".paginate_button.next, .pagination .next a, .pagination li.next a"),
        Locator::xpath(
            "//a[.//svg or .//i][contains(@class,'next') or contains(@aria-label,'Próxima') or contains(@aria-label,'Next')]",
        ),
    ]
}

impl WalkerSettings {
    pub fn table(&self) -> Locator {
        Locator::id(&self.table_id)
    }

    pub fn rows(&self) -> Locator {
        Locator::css(&self.row_selector)
    }

    pub fn back_control(&self) -> Locator {
        Locator::id(&self.back_control_id)
    }

    pub fn detail_table(&self) -> Locator {
        Locator::id(&self.detail_table_id)
    }

    pub fn detail_table_partial(&self) -> Locator {
        Locator::css(format!("[id*='{}']", self.detail_table_id))
    }

    pub fn detail_rows(&self) -> Locator {
        Locator::css(format!("[id*='{}'] > tr", self.detail_table_id))
    }

    pub fn page_size_control(&self) -> Locator {
        Locator::css(&self.page_size_selector)
    }

    /// Direct child-column button of a row.
    pub fn row_action(&self) -> Locator {
        Locator::css(format!("td:nth-child({}) button", self.action_column))
    }

    /// Any button or link below the action column.
    pub fn row_action_fallback(&self) -> Locator {
        let col = self.action_column;
        Locator::xpath(format!(".//td[{col}]//button | .//td[{col}]//a"))
    }

    pub fn cells() -> Locator {
        Locator::css("td")
    }
}

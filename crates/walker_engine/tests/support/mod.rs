//! Scripted in-memory document source for walker tests.
#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, Once};

use async_trait::async_trait;
use serde_json::Value;
use walker_engine::{
    Context, DocumentSource, ElementHandle, Frame, Locator, ProgressSink, SourceError,
    WalkEvent, WalkerSettings,
};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

/// One row of the list table and what its detail view shows.
#[derive(Debug, Clone)]
pub struct RowSpec {
    pub cells: Vec<String>,
    /// `None`: the detail view has no detail table at all.
    pub details: Option<Vec<(String, String)>>,
}

impl RowSpec {
    pub fn category(code: &str, description: &str, details: &[(&str, &str)]) -> Self {
        Self {
            cells: vec![code.to_string(), description.to_string(), String::new()],
            details: Some(
                details
                    .iter()
                    .map(|(c, d)| (c.to_string(), d.to_string()))
                    .collect(),
            ),
        }
    }

    pub fn without_detail_table(code: &str, description: &str) -> Self {
        Self {
            details: None,
            ..Self::category(code, description, &[])
        }
    }

    pub fn blank() -> Self {
        Self::category("", "", &[])
    }

    pub fn short(cells: &[&str]) -> Self {
        Self {
            cells: cells.iter().map(|c| c.to_string()).collect(),
            details: Some(Vec::new()),
        }
    }

    pub fn code(&self) -> &str {
        self.cells.first().map(String::as_str).unwrap_or("")
    }
}

/// `pages` pages of `per_page` categories coded `C{page}{row}`, each with
/// one detail item.
pub fn numbered_pages(pages: usize, per_page: usize, last_page: usize) -> Vec<Vec<RowSpec>> {
    (1..=pages)
        .map(|p| {
            let rows = if p == pages { last_page } else { per_page };
            (0..rows)
                .map(|r| {
                    let code = format!("C{p:02}{r:02}");
                    let detail = format!("{code}.1");
                    let description = format!("Category {p}/{r}");
                    RowSpec::category(&code, &description, &[(detail.as_str(), "Item")])
                })
                .collect()
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Unloaded,
    List,
    Detail(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    Table,
    Row(usize),
    Cell { row: usize, col: usize },
    Action(usize),
    Next,
    Select,
    Iframe,
    Cookie,
    Back,
    DetailTable,
    DetailRow(usize),
    DetailCell { row: usize, col: usize },
}

/// A click the site reacted to, with the checkpoint on disk at that moment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub target: String,
    pub checkpoint: Option<(u32, usize)>,
}

struct Site {
    pages: Vec<Vec<RowSpec>>,
    page: usize,
    view: View,
    /// Bumped on every redraw; handles from older generations are stale.
    generation: u64,
    nodes: Vec<(u64, Node)>,
    in_frame: bool,
    cookie_prompt: bool,
    cookie_dismissed: bool,
    page_size: String,
    disable_next_on_last: bool,
    intercept_native: bool,
    ignored_action_clicks: u32,
    broken_back: bool,
    session_dies_at: Option<String>,
    panics_at: Option<String>,
    /// Once this code has been read, the next listing shows it one row later.
    moves_after_read: Option<String>,
    pending_move: Option<String>,
    watched_checkpoint: Option<PathBuf>,
    observations: Vec<Observation>,
    opened: Vec<String>,
    back_navigations: u32,
    released: u32,
}

impl Site {
    fn rows(&self) -> &[RowSpec] {
        self.pages.get(self.page).map(Vec::as_slice).unwrap_or(&[])
    }

    fn content_frame(&self) -> Frame {
        if self.in_frame {
            Frame::Embedded(0)
        } else {
            Frame::Root
        }
    }

    fn redraw(&mut self) {
        self.generation += 1;
    }

    fn register(&mut self, frame: Frame, nodes: Vec<Node>) -> Vec<ElementHandle> {
        nodes
            .into_iter()
            .map(|node| {
                self.nodes.push((self.generation, node));
                ElementHandle::new((self.nodes.len() - 1).to_string(), frame)
            })
            .collect()
    }

    fn resolve(&self, handle: &ElementHandle) -> Result<Node, SourceError> {
        let (generation, node) = handle
            .key()
            .parse::<usize>()
            .ok()
            .and_then(|i| self.nodes.get(i).copied())
            .ok_or_else(|| SourceError::NotFound(handle.key().to_string()))?;
        if generation != self.generation {
            return Err(SourceError::Stale(format!("{node:?}")));
        }
        Ok(node)
    }

    fn observe(&mut self, target: String) {
        let checkpoint = self
            .watched_checkpoint
            .as_ref()
            .and_then(|path| fs::read_to_string(path).ok())
            .and_then(|text| serde_json::from_str::<Value>(&text).ok())
            .and_then(|json| {
                let page = u32::try_from(json["page"].as_u64()?).ok()?;
                let row = usize::try_from(json["next_row_index"].as_u64()?).ok()?;
                Some((page, row))
            });
        self.observations.push(Observation { target, checkpoint });
    }

    /// Applies a click. Returns `true` when the script asks for a panic.
    fn activate(&mut self, node: Node) -> Result<bool, SourceError> {
        match node {
            Node::Action(row) => {
                let code = self.rows()[row].code().to_string();
                if self.session_dies_at.as_deref() == Some(code.as_str()) {
                    return Err(SourceError::Session("browser went away".to_string()));
                }
                if self.panics_at.as_deref() == Some(code.as_str()) {
                    return Ok(true);
                }
                if self.ignored_action_clicks > 0 {
                    self.ignored_action_clicks -= 1;
                    return Ok(false);
                }
                self.observe(code.clone());
                self.opened.push(code);
                self.view = View::Detail(row);
                self.redraw();
            }
            Node::Back => {
                if !self.broken_back {
                    self.view = View::List;
                    self.redraw();
                }
            }
            Node::Next => {
                if self.page + 1 < self.pages.len() {
                    self.observe("next".to_string());
                    self.page += 1;
                    self.redraw();
                }
            }
            Node::Cookie => self.cookie_dismissed = true,
            _ => {}
        }
        Ok(false)
    }

    /// Swaps the row showing `code` with the one after it, as a live table
    /// re-sorting itself would.
    fn move_down(&mut self, code: &str) {
        let page = self.page;
        if let Some(rows) = self.pages.get_mut(page) {
            if let Some(i) = rows.iter().position(|r| r.code() == code) {
                if i + 1 < rows.len() {
                    rows.swap(i, i + 1);
                    self.redraw();
                }
            }
        }
    }

    fn is_last_page(&self) -> bool {
        self.page + 1 >= self.pages.len()
    }
}

pub struct FakeSite {
    settings: WalkerSettings,
    site: Mutex<Site>,
}

impl FakeSite {
    pub fn new(settings: &WalkerSettings, pages: Vec<Vec<RowSpec>>) -> Self {
        Self {
            settings: settings.clone(),
            site: Mutex::new(Site {
                pages,
                page: 0,
                view: View::Unloaded,
                generation: 0,
                nodes: Vec::new(),
                in_frame: false,
                cookie_prompt: false,
                cookie_dismissed: false,
                page_size: settings.page_size.clone().unwrap_or_default(),
                disable_next_on_last: true,
                intercept_native: false,
                ignored_action_clicks: 0,
                broken_back: false,
                session_dies_at: None,
                panics_at: None,
                moves_after_read: None,
                pending_move: None,
                watched_checkpoint: None,
                observations: Vec::new(),
                opened: Vec::new(),
                back_navigations: 0,
                released: 0,
            }),
        }
    }

    fn site(&self) -> MutexGuard<'_, Site> {
        self.site.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn in_iframe(self) -> Self {
        self.site().in_frame = true;
        self
    }

    pub fn with_cookie_prompt(self) -> Self {
        self.site().cookie_prompt = true;
        self
    }

    pub fn with_page_size(self, size: &str) -> Self {
        self.site().page_size = size.to_string();
        self
    }

    /// The next control stays enabled on the last page but does nothing.
    pub fn inert_next_on_last(self) -> Self {
        self.site().disable_next_on_last = false;
        self
    }

    pub fn intercept_native_clicks(self) -> Self {
        self.site().intercept_native = true;
        self
    }

    pub fn ignore_action_clicks(self, count: u32) -> Self {
        self.site().ignored_action_clicks = count;
        self
    }

    pub fn broken_back(self) -> Self {
        self.site().broken_back = true;
        self
    }

    pub fn session_dies_at(self, code: &str) -> Self {
        self.site().session_dies_at = Some(code.to_string());
        self
    }

    pub fn panics_at(self, code: &str) -> Self {
        self.site().panics_at = Some(code.to_string());
        self
    }

    pub fn moves_row_after_read(self, code: &str) -> Self {
        self.site().moves_after_read = Some(code.to_string());
        self
    }

    pub fn watch_checkpoint(self, path: impl Into<PathBuf>) -> Self {
        self.site().watched_checkpoint = Some(path.into());
        self
    }

    pub fn opened(&self) -> Vec<String> {
        self.site().opened.clone()
    }

    pub fn observations(&self) -> Vec<Observation> {
        self.site().observations.clone()
    }

    pub fn released(&self) -> u32 {
        self.site().released
    }

    pub fn back_navigations(&self) -> u32 {
        self.site().back_navigations
    }

    pub fn cookie_dismissed(&self) -> bool {
        self.site().cookie_dismissed
    }

    pub fn page_size(&self) -> String {
        self.site().page_size.clone()
    }

    /// 1-based page currently shown.
    pub fn current_page(&self) -> usize {
        self.site().page + 1
    }

    fn lookup(&self, site: &Site, locator: &Locator) -> Vec<Node> {
        let s = &self.settings;
        match site.view {
            View::Unloaded => Vec::new(),
            View::List => {
                if *locator == s.table() {
                    vec![Node::Table]
                } else if *locator == s.rows() {
                    (0..site.rows().len()).map(Node::Row).collect()
                } else if Some(locator) == s.next_page_candidates.first() {
                    vec![Node::Next]
                } else if *locator == s.page_size_control() {
                    vec![Node::Select]
                } else {
                    Vec::new()
                }
            }
            View::Detail(row) => {
                let details = site.rows()[row].details.as_ref();
                if *locator == s.back_control() {
                    vec![Node::Back]
                } else if *locator == s.detail_table() || *locator == s.detail_table_partial() {
                    details.map(|_| vec![Node::DetailTable]).unwrap_or_default()
                } else if *locator == s.detail_rows() {
                    details
                        .map(|items| (0..items.len()).map(Node::DetailRow).collect())
                        .unwrap_or_default()
                } else {
                    Vec::new()
                }
            }
        }
    }

    fn click_node(&self, element: &ElementHandle, native: bool) -> Result<(), SourceError> {
        let mut site = self.site();
        let node = site.resolve(element)?;
        if native && site.intercept_native && matches!(node, Node::Action(_)) {
            return Err(SourceError::Intercepted("overlay".to_string()));
        }
        if site.activate(node)? {
            drop(site);
            panic!("scripted panic on {node:?}");
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentSource for FakeSite {
    async fn navigate(&self, _url: &str) -> Result<(), SourceError> {
        let mut site = self.site();
        site.view = View::List;
        site.page = 0;
        site.redraw();
        Ok(())
    }

    async fn navigate_back(&self) -> Result<(), SourceError> {
        let mut site = self.site();
        if let View::Detail(_) = site.view {
            site.view = View::List;
            site.back_navigations += 1;
            site.redraw();
        }
        Ok(())
    }

    async fn find_all(
        &self,
        ctx: &Context,
        locator: &Locator,
    ) -> Result<Vec<ElementHandle>, SourceError> {
        let mut site = self.site();
        let frame = ctx.target();
        if let Frame::Embedded(index) = frame {
            if !site.in_frame || index != 0 {
                return Err(SourceError::NoSuchFrame(frame));
            }
        }
        let loaded = site.view != View::Unloaded;
        if site.view == View::List && *locator == self.settings.rows() {
            if let Some(code) = site.pending_move.take() {
                site.move_down(&code);
            }
        }
        let nodes = if frame == Frame::Root && *locator == Locator::css("iframe") {
            if site.in_frame && loaded {
                vec![Node::Iframe]
            } else {
                Vec::new()
            }
        } else if frame == Frame::Root && Some(locator) == self.settings.cookie_prompt.as_ref() {
            if site.cookie_prompt && !site.cookie_dismissed && loaded {
                vec![Node::Cookie]
            } else {
                Vec::new()
            }
        } else if frame == site.content_frame() {
            self.lookup(&site, locator)
        } else {
            Vec::new()
        };
        Ok(site.register(frame, nodes))
    }

    async fn find_within(
        &self,
        parent: &ElementHandle,
        locator: &Locator,
    ) -> Result<Vec<ElementHandle>, SourceError> {
        let mut site = self.site();
        let node = site.resolve(parent)?;
        let s = &self.settings;
        let nodes = match node {
            Node::Row(row) if *locator == WalkerSettings::cells() => (0..site.rows()[row]
                .cells
                .len())
                .map(|col| Node::Cell { row, col })
                .collect(),
            Node::Row(row) if *locator == s.row_action() || *locator == s.row_action_fallback() => {
                if site.rows()[row].cells.len() >= s.action_column {
                    vec![Node::Action(row)]
                } else {
                    Vec::new()
                }
            }
            Node::DetailRow(row) if *locator == WalkerSettings::cells() => vec![
                Node::DetailCell { row, col: 0 },
                Node::DetailCell { row, col: 1 },
            ],
            _ => Vec::new(),
        };
        Ok(site.register(parent.frame(), nodes))
    }

    async fn text(&self, element: &ElementHandle) -> Result<String, SourceError> {
        let mut site = self.site();
        let text = match site.resolve(element)? {
            Node::Cell { row, col } => {
                let text = site.rows()[row].cells.get(col).cloned();
                if col == 0 && text.is_some() && site.moves_after_read == text {
                    site.pending_move = site.moves_after_read.take();
                }
                text
            }
            Node::DetailCell { row, col } => match site.view {
                View::Detail(open) => site.rows()[open]
                    .details
                    .as_ref()
                    .and_then(|items| items.get(row))
                    .map(|(code, description)| {
                        if col == 0 {
                            code.clone()
                        } else {
                            description.clone()
                        }
                    }),
                _ => None,
            },
            Node::Back => Some("Voltar".to_string()),
            _ => None,
        };
        Ok(text.unwrap_or_default())
    }

    async fn attr(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, SourceError> {
        let site = self.site();
        let node = site.resolve(element)?;
        Ok(match (node, name) {
            (Node::Next, "class") if site.disable_next_on_last && site.is_last_page() => {
                Some("paginate_button next disabled".to_string())
            }
            (Node::Next, "class") => Some("paginate_button next".to_string()),
            _ => None,
        })
    }

    async fn property(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, SourceError> {
        let site = self.site();
        Ok(match (site.resolve(element)?, name) {
            (Node::Select, "value") => Some(site.page_size.clone()),
            _ => None,
        })
    }

    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool, SourceError> {
        self.site().resolve(element).map(|_| true)
    }

    async fn is_enabled(&self, element: &ElementHandle) -> Result<bool, SourceError> {
        self.site().resolve(element).map(|_| true)
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), SourceError> {
        self.click_node(element, true)
    }

    async fn force_click(&self, element: &ElementHandle) -> Result<(), SourceError> {
        self.click_node(element, false)
    }

    async fn scroll_into_view(&self, element: &ElementHandle) -> Result<(), SourceError> {
        self.site().resolve(element).map(|_| ())
    }

    async fn select_value(&self, element: &ElementHandle, value: &str) -> Result<(), SourceError> {
        let mut site = self.site();
        match site.resolve(element)? {
            Node::Select => {
                site.page_size = value.to_string();
                site.redraw();
                Ok(())
            }
            other => Err(SourceError::Script(format!("{other:?} is not a select"))),
        }
    }

    async fn execute(
        &self,
        _ctx: &Context,
        _script: &str,
        _args: Vec<Value>,
    ) -> Result<Value, SourceError> {
        Ok(Value::Null)
    }

    async fn release(&self) -> Result<(), SourceError> {
        self.site().released += 1;
        Ok(())
    }
}

/// Sink that keeps every event for later inspection.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<WalkEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<WalkEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: WalkEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}

/// Data rows of the output CSV, header excluded. Test data carries no
/// separators or quotes, so a plain split is enough.
pub fn output_rows(path: &std::path::Path) -> Vec<Vec<String>> {
    let text = fs::read_to_string(path).unwrap_or_default();
    text.lines()
        .skip(1)
        .filter(|line| !line.is_empty())
        .map(|line| line.split(',').map(str::to_string).collect())
        .collect()
}

pub fn row(fields: [&str; 4]) -> Vec<String> {
    fields.iter().map(|f| f.to_string()).collect()
}

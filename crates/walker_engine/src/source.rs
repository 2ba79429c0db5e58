use std::fmt;

use thiserror::Error;

/// How an element is looked up.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Id(String),
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn id(id: impl Into<String>) -> Self {
        Locator::Id(id.into())
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(path: impl Into<String>) -> Self {
        Locator::XPath(path.into())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Id(id) => write!(f, "#{id}"),
            Locator::Css(sel) => write!(f, "css `{sel}`"),
            Locator::XPath(path) => write!(f, "xpath `{path}`"),
        }
    }
}

/// A rendering context: the root document or one of its embedded frames,
/// numbered in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Frame {
    #[default]
    Root,
    Embedded(u16),
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Root => write!(f, "root document"),
            Frame::Embedded(index) => write!(f, "frame #{index}"),
        }
    }
}

/// Token naming the context lookups resolve against.
///
/// Obtained from [`crate::ensure_context`]; every context-dependent call takes
/// one instead of relying on whichever frame the session happens to be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Context {
    frame: Frame,
}

impl Context {
    pub fn root() -> Self {
        Self { frame: Frame::Root }
    }

    pub fn frame(index: u16) -> Self {
        Self {
            frame: Frame::Embedded(index),
        }
    }

    pub fn target(&self) -> Frame {
        self.frame
    }
}

/// Opaque reference to an element, bound to the frame it was found in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    key: String,
    frame: Frame,
}

impl ElementHandle {
    pub fn new(key: impl Into<String>, frame: Frame) -> Self {
        Self {
            key: key.into(),
            frame,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    pub fn context(&self) -> Context {
        Context { frame: self.frame }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("element is stale: {0}")]
    Stale(String),
    #[error("click intercepted: {0}")]
    Intercepted(String),
    #[error("element not found: {0}")]
    NotFound(String),
    #[error("no such frame: {0}")]
    NoSuchFrame(Frame),
    #[error("script failed: {0}")]
    Script(String),
    #[error("session error: {0}")]
    Session(String),
}

impl SourceError {
    /// Failures caused by the page redrawing underneath us. These are retried
    /// locally; anything else means the session itself is broken.
    pub fn is_transient(&self) -> bool {
        !matches!(self, SourceError::Session(_))
    }
}

/// The rendering/interaction substrate the walker drives.
///
/// Implementations switch to the frame named by the [`Context`] or
/// [`ElementHandle`] before acting.
#[async_trait::async_trait]
pub trait DocumentSource: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), SourceError>;

    async fn navigate_back(&self) -> Result<(), SourceError>;

    async fn find_all(
        &self,
        ctx: &Context,
        locator: &Locator,
    ) -> Result<Vec<ElementHandle>, SourceError>;

    async fn find_within(
        &self,
        parent: &ElementHandle,
        locator: &Locator,
    ) -> Result<Vec<ElementHandle>, SourceError>;

    async fn text(&self, element: &ElementHandle) -> Result<String, SourceError>;

    async fn attr(&self, element: &ElementHandle, name: &str)
        -> Result<Option<String>, SourceError>;

    async fn property(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, SourceError>;

    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool, SourceError>;

    async fn is_enabled(&self, element: &ElementHandle) -> Result<bool, SourceError>;

    /// Native click, subject to interception by overlays.
    async fn click(&self, element: &ElementHandle) -> Result<(), SourceError>;

    /// Script-driven click that bypasses hit testing.
    async fn force_click(&self, element: &ElementHandle) -> Result<(), SourceError>;

    async fn scroll_into_view(&self, element: &ElementHandle) -> Result<(), SourceError>;

    /// Select an option through the standard selection mechanism.
    async fn select_value(&self, element: &ElementHandle, value: &str)
        -> Result<(), SourceError>;

    async fn execute(
        &self,
        ctx: &Context,
        script: &str,
        args: Vec<serde_json::Value>,
    ) -> Result<serde_json::Value, SourceError>;

    /// Ends the session. Called exactly once, on every exit path.
    async fn release(&self) -> Result<(), SourceError>;
}

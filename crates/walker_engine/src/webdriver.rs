use std::sync::Mutex;

use engine_logging::{engine_debug, engine_info};
use fantoccini::elements::{Element, ElementRef};
use fantoccini::error::{CmdError, ErrorStatus};
use fantoccini::{Client, ClientBuilder};
use serde_json::{json, Value};

use crate::source::{Context, DocumentSource, ElementHandle, Frame, Locator, SourceError};

const SCROLL_CENTER_JS: &str = "arguments[0].scrollIntoView({block:'center'});";
const FORCE_CLICK_JS: &str = "arguments[0].click();";

#[derive(Debug, Clone)]
pub struct WebDriverSettings {
    pub webdriver_url: String,
    pub headless: bool,
    pub window_size: (u32, u32),
    pub extra_args: Vec<String>,
}

impl Default for WebDriverSettings {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            headless: true,
            window_size: (1366, 768),
            extra_args: Vec::new(),
        }
    }
}

impl WebDriverSettings {
    fn chrome_args(&self) -> Vec<String> {
        let mut args = vec![
            "--disable-notifications".to_string(),
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            format!("--window-size={},{}", self.window_size.0, self.window_size.1),
        ];
        if self.headless {
            args.push("--headless=new".to_string());
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

/// [`DocumentSource`] backed by a W3C WebDriver session (chromedriver).
pub struct WebDriverSource {
    client: Client,
    /// Frame the session is known to be in; `None` after anything that may
    /// have navigated.
    active: Mutex<Option<Frame>>,
}

impl WebDriverSource {
    pub async fn connect(settings: &WebDriverSettings) -> Result<Self, SourceError> {
        let mut caps = serde_json::Map::new();
        caps.insert(
            "goog:chromeOptions".to_string(),
            json!({ "args": settings.chrome_args() }),
        );
        engine_info!("Connecting to WebDriver at {}", settings.webdriver_url);
        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&settings.webdriver_url)
            .await
            .map_err(|err| SourceError::Session(err.to_string()))?;
        Ok(Self {
            client,
            active: Mutex::new(None),
        })
    }

    fn active(&self) -> Option<Frame> {
        self.active.lock().ok().and_then(|guard| *guard)
    }

    fn set_active(&self, frame: Option<Frame>) {
        if let Ok(mut guard) = self.active.lock() {
            *guard = frame;
        }
    }

    async fn switch_to(&self, frame: Frame) -> Result<(), SourceError> {
        if self.active() == Some(frame) {
            return Ok(());
        }
        self.set_active(None);
        self.client.enter_frame(None).await.map_err(map_cmd_error)?;
        if let Frame::Embedded(index) = frame {
            self.client
                .enter_frame(Some(index))
                .await
                .map_err(|err| match map_cmd_error(err) {
                    SourceError::Session(msg) => SourceError::Session(msg),
                    _ => SourceError::NoSuchFrame(frame),
                })?;
        }
        self.set_active(Some(frame));
        Ok(())
    }

    async fn element(&self, handle: &ElementHandle) -> Result<Element, SourceError> {
        self.switch_to(handle.frame()).await?;
        Ok(Element::from_element_id(
            self.client.clone(),
            ElementRef::from(handle.key().to_string()),
        ))
    }

    async fn run_on(&self, handle: &ElementHandle, script: &str) -> Result<Value, SourceError> {
        let element = self.element(handle).await?;
        let arg =
            serde_json::to_value(&element).map_err(|err| SourceError::Script(err.to_string()))?;
        self.client
            .execute(script, vec![arg])
            .await
            .map_err(map_cmd_error)
    }
}

fn to_handles(elements: Vec<Element>, frame: Frame) -> Vec<ElementHandle> {
    elements
        .into_iter()
        .map(|el| ElementHandle::new(el.element_id().to_string(), frame))
        .collect()
}

fn wd_locator(locator: &Locator) -> fantoccini::Locator<'_> {
    match locator {
        Locator::Id(id) => fantoccini::Locator::Id(id),
        Locator::Css(sel) => fantoccini::Locator::Css(sel),
        Locator::XPath(path) => fantoccini::Locator::XPath(path),
    }
}

fn map_cmd_error(err: CmdError) -> SourceError {
    if err.is_no_such_element() {
        return SourceError::NotFound(err.to_string());
    }
    match &err {
        CmdError::Standard(wd) => match wd.error {
            ErrorStatus::StaleElementReference => SourceError::Stale(err.to_string()),
            ErrorStatus::ElementClickIntercepted | ErrorStatus::ElementNotInteractable => {
                SourceError::Intercepted(err.to_string())
            }
            ErrorStatus::NoSuchElement | ErrorStatus::NoSuchFrame => {
                SourceError::NotFound(err.to_string())
            }
            ErrorStatus::JavascriptError => SourceError::Script(err.to_string()),
            _ => SourceError::Session(err.to_string()),
        },
        _ => SourceError::Session(err.to_string()),
    }
}

#[async_trait::async_trait]
impl DocumentSource for WebDriverSource {
    async fn navigate(&self, url: &str) -> Result<(), SourceError> {
        self.set_active(None);
        self.client.goto(url).await.map_err(map_cmd_error)
    }

    async fn navigate_back(&self) -> Result<(), SourceError> {
        self.set_active(None);
        self.client.back().await.map_err(map_cmd_error)
    }

    async fn find_all(
        &self,
        ctx: &Context,
        locator: &Locator,
    ) -> Result<Vec<ElementHandle>, SourceError> {
        self.switch_to(ctx.target()).await?;
        let found = self
            .client
            .find_all(wd_locator(locator))
            .await
            .map_err(map_cmd_error)?;
        Ok(to_handles(found, ctx.target()))
    }

    async fn find_within(
        &self,
        parent: &ElementHandle,
        locator: &Locator,
    ) -> Result<Vec<ElementHandle>, SourceError> {
        let element = self.element(parent).await?;
        let found = element
            .find_all(wd_locator(locator))
            .await
            .map_err(map_cmd_error)?;
        Ok(to_handles(found, parent.frame()))
    }

    async fn text(&self, element: &ElementHandle) -> Result<String, SourceError> {
        self.element(element)
            .await?
            .text()
            .await
            .map_err(map_cmd_error)
    }

    async fn attr(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, SourceError> {
        self.element(element)
            .await?
            .attr(name)
            .await
            .map_err(map_cmd_error)
    }

    async fn property(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, SourceError> {
        self.element(element)
            .await?
            .prop(name)
            .await
            .map_err(map_cmd_error)
    }

    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool, SourceError> {
        self.element(element)
            .await?
            .is_displayed()
            .await
            .map_err(map_cmd_error)
    }

    async fn is_enabled(&self, element: &ElementHandle) -> Result<bool, SourceError> {
        self.element(element)
            .await?
            .is_enabled()
            .await
            .map_err(map_cmd_error)
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), SourceError> {
        let el = self.element(element).await?;
        let result = el.click().await.map_err(map_cmd_error);
        self.set_active(None);
        result
    }

    async fn force_click(&self, element: &ElementHandle) -> Result<(), SourceError> {
        let result = self.run_on(element, FORCE_CLICK_JS).await.map(|_| ());
        self.set_active(None);
        result
    }

    async fn scroll_into_view(&self, element: &ElementHandle) -> Result<(), SourceError> {
        self.run_on(element, SCROLL_CENTER_JS).await.map(|_| ())
    }

    async fn select_value(
        &self,
        element: &ElementHandle,
        value: &str,
    ) -> Result<(), SourceError> {
        let el = self.element(element).await?;
        let result = el.select_by_value(value).await.map_err(map_cmd_error);
        self.set_active(None);
        result
    }

    async fn execute(
        &self,
        ctx: &Context,
        script: &str,
        args: Vec<Value>,
    ) -> Result<Value, SourceError> {
        self.switch_to(ctx.target()).await?;
        self.client
            .execute(script, args)
            .await
            .map_err(map_cmd_error)
    }

    async fn release(&self) -> Result<(), SourceError> {
        engine_debug!("Closing WebDriver session");
        self.set_active(None);
        self.client
            .clone()
            .close()
            .await
            .map_err(|err| SourceError::Session(err.to_string()))
    }
}

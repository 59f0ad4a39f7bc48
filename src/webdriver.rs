use anyhow::Context;
use async_trait::async_trait;
use fantoccini::actions::{InputSource, MOUSE_BUTTON_LEFT, MouseActions, PointerAction};
use fantoccini::elements::{Element, ElementRef};
use fantoccini::error::CmdError;
use fantoccini::wd::TimeoutConfiguration;
use fantoccini::{Client, ClientBuilder};
use serde_json::{Value, json};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info};

use crate::errors::{Result, TestabilityError};
use crate::page::{Page, PageError};
use crate::types::{ElementHandle, Locator};

/// Supported browser types
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserType {
    /// Mozilla Firefox
    Firefox,
    /// Google Chrome/Chromium
    Chrome,
}

impl std::str::FromStr for BrowserType {
    type Err = anyhow::Error;

    /// Parse browser type from string (case-insensitive)
    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "firefox" => Ok(BrowserType::Firefox),
            "chrome" | "chromium" => Ok(BrowserType::Chrome),
            _ => anyhow::bail!("Unsupported browser: {}", s),
        }
    }
}

impl BrowserType {
    /// Port the browser's driver listens on by default
    pub fn default_webdriver_url(&self) -> &'static str {
        match self {
            BrowserType::Firefox => "http://localhost:4444",
            BrowserType::Chrome => "http://localhost:9515",
        }
    }

    fn driver_name(&self) -> &'static str {
        match self {
            BrowserType::Firefox => "geckodriver",
            BrowserType::Chrome => "chromedriver",
        }
    }

    /// Session capabilities for this browser
    pub fn capabilities(&self, headless: bool) -> serde_json::Map<String, Value> {
        let mut caps = serde_json::Map::new();
        match self {
            BrowserType::Firefox => {
                let mut args = Vec::new();
                if headless {
                    args.push("--headless".to_string());
                }
                caps.insert("moz:firefoxOptions".to_string(), json!({ "args": args }));
            }
            BrowserType::Chrome => {
                let mut args = vec!["--no-sandbox".to_string()];
                if headless {
                    args.push("--headless=new".to_string());
                    args.push("--disable-gpu".to_string());
                    args.push("--disable-dev-shm-usage".to_string());
                }
                caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
            }
        }
        caps
    }
}

/// [`Page`] backed by a fantoccini WebDriver client
pub struct WebDriverPage {
    client: Client,
    script_timeout: Mutex<Option<Duration>>,
}

impl WebDriverPage {
    /// Connect to a running WebDriver server and start a session
    pub async fn connect(browser_type: BrowserType, webdriver_url: &str, headless: bool) -> Result<Self> {
        info!("Connecting to {:?} WebDriver at {}", browser_type, webdriver_url);

        if !Self::is_webdriver_running(webdriver_url).await {
            let driver_name = browser_type.driver_name();
            return Err(TestabilityError::WebDriverFailed(format!(
                "Cannot connect to {} at {}.\n\
                Please ensure {} is running:\n\
                  For Firefox: geckodriver --port 4444\n\
                  For Chrome: chromedriver --port 9515",
                driver_name, webdriver_url, driver_name
            )));
        }

        let client = ClientBuilder::rustls()
            .capabilities(browser_type.capabilities(headless))
            .connect(webdriver_url)
            .await
            .context("Failed to connect to WebDriver")?;

        Ok(Self::from_client(client))
    }

    /// Wrap an already connected client
    pub fn from_client(client: Client) -> Self {
        Self {
            client,
            script_timeout: Mutex::new(None),
        }
    }

    async fn is_webdriver_running(url: &str) -> bool {
        let status_url = format!("{}/status", url.trim_end_matches('/'));

        match reqwest::Client::new()
            .get(&status_url)
            .timeout(Duration::from_secs(2))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("WebDriver status check failed: {}", e);
                false
            }
        }
    }

    // Handles only carry the WebDriver id; a stale id fails on use
    fn element(&self, handle: &ElementHandle) -> Element {
        Element::from_element_id(self.client.clone(), element_ref(handle))
    }

    async fn set_script_timeout(&self, budget: Duration) -> std::result::Result<(), PageError> {
        let current = self.script_timeout.lock().ok().and_then(|t| *t);
        if current == Some(budget) {
            return Ok(());
        }

        self.client
            .update_timeouts(TimeoutConfiguration::new(Some(budget), None, None))
            .await
            .map_err(map_cmd_error)?;
        if let Ok(mut timeout) = self.script_timeout.lock() {
            *timeout = Some(budget);
        }
        Ok(())
    }
}

fn element_ref(handle: &ElementHandle) -> ElementRef {
    ElementRef::from(handle.id.clone())
}

fn element_handle(element: &Element) -> ElementHandle {
    ElementHandle::new(element.element_id().to_string())
}

fn map_cmd_error(err: CmdError) -> PageError {
    let message = err.to_string();
    let lower = message.to_lowercase();
    if lower.contains("script timeout") {
        PageError::ScriptTimeout
    } else if lower.contains("no such element") || lower.contains("stale element") {
        PageError::NoSuchElement(message)
    } else if lower.contains("javascript error") {
        PageError::Script(message)
    } else {
        PageError::Command(message)
    }
}

#[async_trait]
impl Page for WebDriverPage {
    async fn goto(&self, url: &str) -> std::result::Result<(), PageError> {
        self.client.goto(url).await.map_err(map_cmd_error)
    }

    async fn back(&self) -> std::result::Result<(), PageError> {
        self.client.back().await.map_err(map_cmd_error)
    }

    async fn forward(&self) -> std::result::Result<(), PageError> {
        self.client.forward().await.map_err(map_cmd_error)
    }

    async fn current_url(&self) -> std::result::Result<String, PageError> {
        let url = self.client.current_url().await.map_err(map_cmd_error)?;
        Ok(url.to_string())
    }

    async fn find(&self, locator: &Locator) -> std::result::Result<ElementHandle, PageError> {
        debug!("Finding element with locator: {}", locator);
        let by = match locator {
            Locator::Css(v) => fantoccini::Locator::Css(v),
            Locator::Id(v) => fantoccini::Locator::Id(v),
            Locator::LinkText(v) => fantoccini::Locator::LinkText(v),
            Locator::XPath(v) => fantoccini::Locator::XPath(v),
        };
        let element = self.client.find(by).await.map_err(map_cmd_error)?;
        Ok(element_handle(&element))
    }

    async fn click(&self, element: &ElementHandle) -> std::result::Result<(), PageError> {
        self.element(element).click().await.map_err(map_cmd_error)?;
        Ok(())
    }

    async fn clear(&self, element: &ElementHandle) -> std::result::Result<(), PageError> {
        self.element(element).clear().await.map_err(map_cmd_error)
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> std::result::Result<(), PageError> {
        self.element(element)
            .send_keys(text)
            .await
            .map_err(map_cmd_error)
    }

    async fn drag_and_drop(
        &self,
        source: &ElementHandle,
        target: &ElementHandle,
    ) -> std::result::Result<(), PageError> {
        let drag = MouseActions::new("mouse".to_string())
            .then(PointerAction::MoveToElement {
                element: self.element(source),
                duration: None,
                x: 0,
                y: 0,
            })
            .then(PointerAction::Down {
                button: MOUSE_BUTTON_LEFT,
            })
            .then(PointerAction::MoveToElement {
                element: self.element(target),
                duration: Some(Duration::from_millis(250)),
                x: 0,
                y: 0,
            })
            .then(PointerAction::Up {
                button: MOUSE_BUTTON_LEFT,
            });
        self.client
            .perform_actions(drag)
            .await
            .map_err(map_cmd_error)?;
        self.client.release_actions().await.map_err(map_cmd_error)
    }

    async fn execute(&self, script: &str, args: Vec<Value>) -> std::result::Result<Value, PageError> {
        self.client.execute(script, args).await.map_err(map_cmd_error)
    }

    async fn execute_async(
        &self,
        script: &str,
        args: Vec<Value>,
        budget: Duration,
    ) -> std::result::Result<Value, PageError> {
        self.set_script_timeout(budget).await?;
        self.client
            .execute_async(script, args)
            .await
            .map_err(map_cmd_error)
    }

    async fn close_window(&self) -> std::result::Result<(), PageError> {
        self.client.close_window().await.map_err(map_cmd_error)
    }

    async fn quit(&self) -> std::result::Result<(), PageError> {
        self.client.clone().close().await.map_err(map_cmd_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_type_parsing() {
        assert_eq!("Firefox".parse::<BrowserType>().unwrap(), BrowserType::Firefox);
        assert_eq!("chromium".parse::<BrowserType>().unwrap(), BrowserType::Chrome);
        assert!("safari".parse::<BrowserType>().is_err());
    }

    #[test]
    fn test_headless_capabilities() {
        let caps = BrowserType::Chrome.capabilities(true);
        let args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
        assert!(args.contains(&json!("--headless=new")));

        let caps = BrowserType::Firefox.capabilities(false);
        assert_eq!(caps["moz:firefoxOptions"]["args"], json!([]));
    }

    #[test]
    fn test_browser_type_serde() {
        assert_eq!(serde_json::to_value(BrowserType::Chrome).unwrap(), json!("chrome"));
        let parsed: BrowserType = serde_json::from_value(json!("firefox")).unwrap();
        assert_eq!(parsed, BrowserType::Firefox);
    }

    #[test]
    fn test_element_ref_from_handle_id() {
        let handle = ElementHandle::new("f.7A3C.d.1B2E.e.42");
        let reference = element_ref(&handle);
        assert_eq!(&*reference, "f.7A3C.d.1B2E.e.42");
        assert_eq!(reference.to_string(), handle.id);
    }
}

//! One browser session: the page, its settings and the hook chain.
//!
//! Every browser action runs through [`Session::dispatch`], which fires the
//! before hooks, performs the command and fires the after hooks. Keywords
//! are the public methods spread over this module and `instrument`,
//! `readiness`, `keywords` and `elements`.

use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::TestabilityConfig;
use crate::errors::{Result, TestabilityError};
use crate::instrument::{AgentBundle, AgentConfig};
use crate::listener::{Action, Event, EventListener, Phase, TestabilityListener};
use crate::page::{Page, PageError};
use crate::settings::TestabilitySettings;
use crate::types::{ElementHandle, Locator};

pub struct Session {
    page: Arc<dyn Page>,
    settings: TestabilitySettings,
    pub(crate) agent_bundle: AgentBundle,
    pub(crate) agent_config: AgentConfig,
    pub(crate) hidden_elements: HashMap<String, String>,
    listeners: Vec<Arc<dyn EventListener>>,
}

impl Session {
    /// Create a session with default settings and the testability listener
    pub fn new(page: Arc<dyn Page>) -> Self {
        Self::with_settings(page, TestabilitySettings::default())
    }

    pub fn with_settings(page: Arc<dyn Page>, settings: TestabilitySettings) -> Self {
        debug!("Session: new({:?})", settings);
        Self {
            page,
            settings,
            agent_bundle: AgentBundle::embedded(),
            agent_config: AgentConfig::default(),
            hidden_elements: HashMap::new(),
            listeners: vec![Arc::new(TestabilityListener)],
        }
    }

    /// Create a session from loaded configuration, reading the agent bundle
    pub fn from_config(page: Arc<dyn Page>, config: &TestabilityConfig) -> Result<Self> {
        let mut session = Self::with_settings(page, config.settings());
        session.agent_bundle = AgentBundle::load(config.agent_bundle.as_deref())?;
        session.agent_config = config.agent.clone();
        Ok(session)
    }

    /// Replace the page agent script injected into pages
    pub fn with_agent_bundle(mut self, bundle: AgentBundle) -> Self {
        self.agent_bundle = bundle;
        self
    }

    pub fn page(&self) -> &Arc<dyn Page> {
        &self.page
    }

    pub fn settings(&self) -> &TestabilitySettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut TestabilitySettings {
        &mut self.settings
    }

    /// Append a listener to the end of the hook chain
    pub fn add_listener(&mut self, listener: Arc<dyn EventListener>) {
        debug!("Session: add_listener({})", listener.name());
        self.listeners.push(listener);
    }

    /// Remove every listener registered under `name`
    pub fn remove_listener(&mut self, name: &str) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.name() != name);
        before != self.listeners.len()
    }

    pub fn listener_names(&self) -> Vec<String> {
        self.listeners.iter().map(|l| l.name().to_string()).collect()
    }

    /// Run `perform` against the page between the before and after hooks
    pub async fn dispatch<T, F, Fut>(
        &mut self,
        keyword: &str,
        action: Action<'_>,
        perform: F,
    ) -> Result<T>
    where
        F: FnOnce(Arc<dyn Page>) -> Fut + Send,
        Fut: Future<Output = std::result::Result<T, PageError>> + Send,
        T: Send,
    {
        self.fire(keyword, Phase::Before, &action).await?;
        let output = perform(Arc::clone(&self.page)).await?;
        self.fire(keyword, Phase::After, &action).await?;
        Ok(output)
    }

    async fn fire(&mut self, keyword: &str, phase: Phase, action: &Action<'_>) -> Result<()> {
        let listeners = self.listeners.clone();
        let event = Event {
            keyword,
            phase,
            action,
        };
        for listener in &listeners {
            listener.on_event(&event, self).await?;
        }
        Ok(())
    }

    /// Navigate the current window to `url`
    pub async fn go_to(&mut self, url: &str) -> Result<()> {
        url::Url::parse(url)
            .map_err(|e| TestabilityError::config(format!("Invalid URL '{}': {}", url, e)))?;
        info!("Navigating to {}", url);

        let target = url.to_string();
        self.dispatch("go_to", Action::NavigateTo(url), move |page| async move {
            page.goto(&target).await
        })
        .await?;
        self.hidden_elements.clear();
        Ok(())
    }

    pub async fn go_back(&mut self) -> Result<()> {
        self.dispatch("go_back", Action::NavigateBack, |page| async move {
            page.back().await
        })
        .await?;
        self.hidden_elements.clear();
        Ok(())
    }

    pub async fn go_forward(&mut self) -> Result<()> {
        self.dispatch("go_forward", Action::NavigateForward, |page| async move {
            page.forward().await
        })
        .await?;
        self.hidden_elements.clear();
        Ok(())
    }

    pub async fn get_location(&mut self) -> Result<String> {
        Ok(self.page.current_url().await?)
    }

    /// Find the first element matching `locator` on behalf of `keyword`
    pub async fn find_element(&mut self, keyword: &str, locator: &str) -> Result<ElementHandle> {
        let parsed: Locator = locator.parse()?;
        let target = parsed.clone();
        let found = self
            .dispatch(keyword, Action::Find(&parsed), move |page| async move {
                page.find(&target).await
            })
            .await;

        match found {
            Err(TestabilityError::Evaluation(PageError::NoSuchElement(_))) => {
                Err(TestabilityError::ElementNotFound(locator.to_string()))
            }
            other => other,
        }
    }

    pub async fn click_element(&mut self, locator: &str) -> Result<()> {
        debug!("Session: click_element({})", locator);
        let element = self.find_element("click_element", locator).await?;
        let target = element.clone();
        self.dispatch("click_element", Action::Click(&element), move |page| async move {
            page.click(&target).await
        })
        .await
    }

    /// Replace the text of an input element
    pub async fn input_text(&mut self, locator: &str, text: &str) -> Result<()> {
        debug!("Session: input_text({}, {} chars)", locator, text.len());
        let element = self.find_element("input_text", locator).await?;
        let target = element.clone();
        let text = text.to_string();
        self.dispatch(
            "input_text",
            Action::ChangeValue(&element),
            move |page| async move {
                page.clear(&target).await?;
                page.send_keys(&target, &text).await
            },
        )
        .await
    }

    pub async fn clear_element_text(&mut self, locator: &str) -> Result<()> {
        let element = self.find_element("clear_element_text", locator).await?;
        let target = element.clone();
        self.dispatch(
            "clear_element_text",
            Action::ChangeValue(&element),
            move |page| async move { page.clear(&target).await },
        )
        .await
    }

    pub async fn execute_javascript(&mut self, script: &str, args: Vec<Value>) -> Result<Value> {
        self.run_script("execute_javascript", script, args).await
    }

    /// Run an asynchronous script, bounded by the session timeout
    pub async fn execute_async_javascript(
        &mut self,
        script: &str,
        args: Vec<Value>,
    ) -> Result<Value> {
        let budget = self.settings.timeout;
        self.run_async_script("execute_async_javascript", script, args, budget)
            .await
    }

    pub async fn close_window(&mut self) -> Result<()> {
        self.dispatch("close_window", Action::Close, |page| async move {
            page.close_window().await
        })
        .await
    }

    /// End the WebDriver session
    pub async fn close_browser(&mut self) -> Result<()> {
        info!("Closing browser session");
        self.dispatch("close_browser", Action::Quit, |page| async move {
            page.quit().await
        })
        .await
    }

    pub(crate) async fn run_script(
        &mut self,
        keyword: &str,
        script: &str,
        args: Vec<Value>,
    ) -> Result<Value> {
        let source = script.to_string();
        self.dispatch(keyword, Action::ExecuteScript(script), move |page| async move {
            page.execute(&source, args).await
        })
        .await
    }

    pub(crate) async fn run_async_script(
        &mut self,
        keyword: &str,
        script: &str,
        args: Vec<Value>,
        budget: Duration,
    ) -> Result<Value> {
        let source = script.to_string();
        self.dispatch(keyword, Action::ExecuteScript(script), move |page| async move {
            page.execute_async(&source, args, budget).await
        })
        .await
    }
}

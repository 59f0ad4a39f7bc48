//! Before/after hooks around every browser action.
//!
//! Listeners are an explicit chain owned by the [`Session`]; each receives
//! the event and the session itself, so a hook can run keywords of its own.
//! Keywords listed in [`SAFE_KEYWORDS`] never trigger an automatic wait,
//! which keeps the wait keyword from waiting on itself.

use async_trait::async_trait;
use tracing::debug;

use crate::errors::Result;
use crate::session::Session;
use crate::types::{ElementHandle, Locator};

/// Keywords exempt from automatic readiness waits
pub const SAFE_KEYWORDS: &[&str] = &[
    "close_browser",
    "close_window",
    "get_location",
    "get_testability_timeout",
    "set_testability_timeout",
    "get_testability_error_on_timeout",
    "set_testability_error_on_timeout",
    "set_testability_automatic_wait",
    "enable_testability_automatic_wait",
    "disable_testability_automatic_wait",
    "set_testability_automatic_injection",
    "enable_testability_automatic_injection",
    "disable_testability_automatic_injection",
    "instrument_browser",
    "is_testability_installed",
    "wait_for_testability_ready",
    "wait_for_document_ready",
];

pub fn is_safe_keyword(keyword: &str) -> bool {
    SAFE_KEYWORDS.contains(&keyword)
}

/// When a hook fires relative to its action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Before,
    After,
}

/// Browser action being dispatched
#[derive(Debug)]
pub enum Action<'a> {
    NavigateTo(&'a str),
    NavigateBack,
    NavigateForward,
    Find(&'a Locator),
    Click(&'a ElementHandle),
    ChangeValue(&'a ElementHandle),
    DragAndDrop {
        source: &'a ElementHandle,
        target: &'a ElementHandle,
    },
    ExecuteScript(&'a str),
    Close,
    Quit,
}

impl Action<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Action::NavigateTo(_) => "navigate_to",
            Action::NavigateBack => "navigate_back",
            Action::NavigateForward => "navigate_forward",
            Action::Find(_) => "find",
            Action::Click(_) => "click",
            Action::ChangeValue(_) => "change_value_of",
            Action::DragAndDrop { .. } => "drag_and_drop",
            Action::ExecuteScript(_) => "execute_script",
            Action::Close => "close",
            Action::Quit => "quit",
        }
    }

    /// Navigations replace the page, and the agent with it
    pub fn is_navigation(&self) -> bool {
        matches!(
            self,
            Action::NavigateTo(_) | Action::NavigateBack | Action::NavigateForward
        )
    }

    /// Interactions that should only happen on a settled page
    pub fn is_interaction(&self) -> bool {
        matches!(
            self,
            Action::Find(_)
                | Action::Click(_)
                | Action::ChangeValue(_)
                | Action::DragAndDrop { .. }
        )
    }
}

/// One hook invocation
#[derive(Debug)]
pub struct Event<'a> {
    /// Keyword on whose behalf the action runs
    pub keyword: &'a str,
    pub phase: Phase,
    pub action: &'a Action<'a>,
}

#[async_trait]
pub trait EventListener: Send + Sync {
    /// Identifier used to remove the listener again
    fn name(&self) -> &str;

    async fn on_event(&self, event: &Event<'_>, session: &mut Session) -> Result<()>;
}

/// Injects the page agent after navigation and waits for readiness before
/// interactions, according to the session settings.
#[derive(Debug, Default, Clone)]
pub struct TestabilityListener;

impl TestabilityListener {
    pub const NAME: &'static str = "testability";
}

#[async_trait]
impl EventListener for TestabilityListener {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn on_event(&self, event: &Event<'_>, session: &mut Session) -> Result<()> {
        debug!(
            "TestabilityListener: {:?} {} ({}) {:?}",
            event.phase,
            event.action.name(),
            event.keyword,
            event.action
        );

        let settings = session.settings().clone();
        match event.phase {
            Phase::After if event.action.is_navigation() => {
                if settings.automatic_injection {
                    session.instrument_browser().await?;
                }
            }
            Phase::Before if event.action.is_interaction() => {
                if is_safe_keyword(event.keyword) {
                    return Ok(());
                }
                // Injection first: waiting on a page without the agent
                // could only ever time out
                if settings.automatic_injection {
                    session.instrument_browser().await?;
                }
                if settings.automatic_wait {
                    session
                        .wait_for_ready(settings.timeout, settings.error_on_timeout)
                        .await?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

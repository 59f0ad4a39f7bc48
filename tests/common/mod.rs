// Common test utilities and fixtures
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

use testability::scripts;
use testability::types::ELEMENT_KEY;
use testability::{AgentBundle, ElementHandle, Locator, Page, PageError, Session};

/// Stand-in for the page agent bundle; the fake recognises it by identity
pub const FAKE_BUNDLE: &str = "/* fake testability agent */";

/// In-flight network call
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub url: String,
}

/// Browser tab simulated in memory, including the page agent
#[derive(Debug)]
pub struct FakeState {
    pub url: String,
    /// Agent bundle evaluated in the current document
    pub agent_loaded: bool,
    pub instrumented: bool,
    /// `window.testabilityConfig`
    pub config: Value,
    pub injections: usize,
    /// Tracked work: a timer running until this instant
    pub busy_until: Option<Instant>,
    /// Tracked work that never finishes
    pub never_ready: bool,
    pub requests: Vec<Request>,
    pub document_loading: bool,
    pub fail_bundle: bool,
    /// Locators matching nothing
    pub missing: HashSet<String>,
    /// Inline `style.display` by element id
    pub displays: HashMap<String, String>,
    pub blocked: HashSet<String>,
    pub attributes: HashMap<(String, String), String>,
    pub values: HashMap<String, String>,
    pub element_at: Option<String>,
    pub scroll: Option<&'static str>,
    /// Every command, in order
    pub calls: Vec<String>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            url: "about:blank".to_string(),
            agent_loaded: false,
            instrumented: false,
            config: Value::Null,
            injections: 0,
            busy_until: None,
            never_ready: false,
            requests: Vec::new(),
            document_loading: false,
            fail_bundle: false,
            missing: HashSet::new(),
            displays: HashMap::new(),
            blocked: HashSet::new(),
            attributes: HashMap::new(),
            values: HashMap::new(),
            element_at: None,
            scroll: None,
            calls: Vec::new(),
        }
    }
}

impl FakeState {
    fn new_document(&mut self, url: String) {
        self.url = url;
        self.agent_loaded = false;
        self.instrumented = false;
        self.config = Value::Null;
        self.busy_until = None;
        self.never_ready = false;
        self.requests.clear();
        self.displays.clear();
    }

    fn blacklisted(&self, request: &Request) -> bool {
        let Some(entries) = self.config.get("blacklist").and_then(Value::as_array) else {
            return false;
        };
        entries.iter().any(|entry| {
            let pattern = entry["url"].as_str().unwrap_or_default();
            let method_matches = entry["method"]
                .as_str()
                .is_none_or(|m| m.eq_ignore_ascii_case(&request.method));
            !pattern.is_empty() && request.url.contains(pattern) && method_matches
        })
    }

    /// When the agent will report ready, `None` if never
    fn ready_at(&self, now: Instant) -> Option<Instant> {
        if self.never_ready || self.requests.iter().any(|r| !self.blacklisted(r)) {
            return None;
        }
        Some(self.busy_until.map_or(now, |t| t.max(now)))
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakePage {
    state: Arc<Mutex<FakeState>>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    /// A session over this page using the fake agent bundle
    pub fn session(&self) -> Session {
        Session::new(Arc::new(self.clone())).with_agent_bundle(AgentBundle::inline(FAKE_BUNDLE))
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Calls whose name is one of `names` (ignoring any `:argument` suffix)
    pub fn calls_named(&self, names: &[&str]) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| names.contains(&c.split(':').next().unwrap_or_default()))
            .collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls_named(&[name]).len()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Simulate a tracked timer finishing after `duration`
    pub fn busy_for(&self, duration: Duration) {
        self.state().busy_until = Some(Instant::now() + duration);
    }

    pub fn never_ready(&self) {
        self.state().never_ready = true;
    }

    pub fn start_request(&self, method: &str, url: &str) {
        self.state().requests.push(Request {
            method: method.to_string(),
            url: url.to_string(),
        });
    }

    pub fn finish_requests(&self) {
        self.state().requests.clear();
    }

    fn record(&self, call: impl Into<String>) {
        self.state().calls.push(call.into());
    }
}

fn element_id(args: &[Value], index: usize) -> String {
    args.get(index)
        .and_then(ElementHandle::from_reference)
        .map(|e| e.id)
        .unwrap_or_default()
}

#[async_trait]
impl Page for FakePage {
    async fn goto(&self, url: &str) -> Result<(), PageError> {
        let mut state = self.state();
        state.calls.push(format!("goto:{}", url));
        state.new_document(url.to_string());
        Ok(())
    }

    async fn back(&self) -> Result<(), PageError> {
        let mut state = self.state();
        state.calls.push("back".to_string());
        state.new_document("about:back".to_string());
        Ok(())
    }

    async fn forward(&self) -> Result<(), PageError> {
        let mut state = self.state();
        state.calls.push("forward".to_string());
        state.new_document("about:forward".to_string());
        Ok(())
    }

    async fn current_url(&self) -> Result<String, PageError> {
        Ok(self.state().url.clone())
    }

    async fn find(&self, locator: &Locator) -> Result<ElementHandle, PageError> {
        let id = locator.to_string();
        let mut state = self.state();
        state.calls.push(format!("find:{}", id));
        if state.missing.contains(&id) {
            return Err(PageError::NoSuchElement(id));
        }
        Ok(ElementHandle::new(id))
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), PageError> {
        self.record(format!("click:{}", element.id));
        Ok(())
    }

    async fn clear(&self, element: &ElementHandle) -> Result<(), PageError> {
        let mut state = self.state();
        state.calls.push(format!("clear:{}", element.id));
        state.values.insert(element.id.clone(), String::new());
        Ok(())
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<(), PageError> {
        let mut state = self.state();
        state.calls.push(format!("send_keys:{}", element.id));
        state
            .values
            .entry(element.id.clone())
            .or_default()
            .push_str(text);
        Ok(())
    }

    async fn drag_and_drop(
        &self,
        source: &ElementHandle,
        target: &ElementHandle,
    ) -> Result<(), PageError> {
        self.record(format!("drag:{}->{}", source.id, target.id));
        Ok(())
    }

    async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value, PageError> {
        let mut state = self.state();
        if script == scripts::IS_INSTALLED {
            state.calls.push("probe".to_string());
            return Ok(json!(state.agent_loaded));
        }
        if script == scripts::SET_AGENT_CONFIG {
            state.calls.push("set_config".to_string());
            state.config = args.first().cloned().unwrap_or(Value::Null);
            return Ok(Value::Null);
        }
        if script == FAKE_BUNDLE {
            if state.fail_bundle {
                return Err(PageError::Script("SyntaxError: unexpected token".to_string()));
            }
            state.calls.push("inject".to_string());
            state.agent_loaded = true;
            state.injections += 1;
            return Ok(Value::Null);
        }
        if script == scripts::INSTRUMENT_BROWSER {
            if !state.agent_loaded {
                return Err(PageError::Script(
                    "window.instrumentBrowser is not a function".to_string(),
                ));
            }
            state.calls.push("instrument".to_string());
            state.instrumented = true;
            return Ok(Value::Null);
        }
        if script == scripts::GET_STYLE_DISPLAY {
            let id = element_id(&args, 0);
            return Ok(json!(state.displays.get(&id).cloned().unwrap_or_default()));
        }
        if script == scripts::SET_STYLE_DISPLAY {
            let id = element_id(&args, 0);
            let display = args.get(1).and_then(Value::as_str).unwrap_or_default();
            state.calls.push(format!("set_display:{}", id));
            state.displays.insert(id, display.to_string());
            return Ok(Value::Null);
        }
        if script == scripts::IS_ELEMENT_BLOCKED {
            let id = element_id(&args, 0);
            return Ok(json!(state.blocked.contains(&id)));
        }
        if script == scripts::GET_ELEMENT_AT {
            return Ok(match &state.element_at {
                Some(id) => json!({ ELEMENT_KEY: id }),
                None => Value::Null,
            });
        }
        if script == scripts::SET_ELEMENT_ATTRIBUTE {
            let id = element_id(&args, 0);
            let name = args.get(1).and_then(Value::as_str).unwrap_or_default();
            let value = args.get(2).and_then(Value::as_str).unwrap_or_default();
            state
                .attributes
                .insert((id, name.to_string()), value.to_string());
            return Ok(Value::Null);
        }
        if script == scripts::DRAG_AND_DROP {
            let source = element_id(&args, 0);
            let target = element_id(&args, 1);
            state.calls.push(format!("html5_drag:{}->{}", source, target));
            return Ok(Value::Null);
        }
        if script == scripts::SCROLL_TO_BOTTOM {
            state.scroll = Some("bottom");
            return Ok(Value::Null);
        }
        if script == scripts::SCROLL_TO_TOP {
            state.scroll = Some("top");
            return Ok(Value::Null);
        }

        state.calls.push("execute".to_string());
        Ok(Value::Array(args))
    }

    async fn execute_async(
        &self,
        script: &str,
        args: Vec<Value>,
        budget: Duration,
    ) -> Result<Value, PageError> {
        let now = Instant::now();
        let ready_at = {
            let mut state = self.state();
            if script == scripts::WAIT_FOR_TESTABILITY {
                state.calls.push("wait".to_string());
                if !state.agent_loaded {
                    return Err(PageError::Script(
                        "window.testability is undefined".to_string(),
                    ));
                }
                state.ready_at(now)
            } else if script == scripts::WAIT_FOR_DOCUMENT_READY {
                state.calls.push("document_ready".to_string());
                if state.document_loading { None } else { Some(now) }
            } else {
                state.calls.push("execute_async".to_string());
                return Ok(Value::Array(args));
            }
        };

        match ready_at {
            Some(at) if at <= now + budget => {
                tokio::time::sleep_until(at).await;
                Ok(json!(true))
            }
            _ => {
                tokio::time::sleep(budget).await;
                Err(PageError::ScriptTimeout)
            }
        }
    }

    async fn close_window(&self) -> Result<(), PageError> {
        self.record("close_window");
        Ok(())
    }

    async fn quit(&self) -> Result<(), PageError> {
        self.record("quit");
        Ok(())
    }
}

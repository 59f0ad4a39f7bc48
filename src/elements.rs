//! Element utilities: visibility, overlay detection, attributes, scrolling and drag and drop.

use serde_json::{Value, json};
use tracing::debug;

use crate::errors::{Result, TestabilityError};
use crate::listener::Action;
use crate::scripts;
use crate::session::Session;
use crate::types::ElementHandle;

impl Session {
    /// Hide an element with `display: none`, remembering its previous display
    pub async fn hide_element(&mut self, locator: &str) -> Result<()> {
        debug!("Session: hide_element({})", locator);
        let element = self.find_element("hide_element", locator).await?;
        let current = self
            .run_script("hide_element", scripts::GET_STYLE_DISPLAY, vec![element.to_json()])
            .await?;
        self.run_script(
            "hide_element",
            scripts::SET_STYLE_DISPLAY,
            vec![element.to_json(), json!("none")],
        )
        .await?;

        // Hiding twice must not overwrite the original display
        self.hidden_elements
            .entry(locator.to_string())
            .or_insert_with(|| current.as_str().unwrap_or_default().to_string());
        Ok(())
    }

    /// Restore an element hidden by [`Session::hide_element`].
    ///
    /// Elements never hidden here get an empty inline display.
    pub async fn show_element(&mut self, locator: &str) -> Result<()> {
        debug!("Session: show_element({})", locator);
        let element = self.find_element("show_element", locator).await?;
        let display = self.hidden_elements.get(locator).cloned().unwrap_or_default();
        self.run_script(
            "show_element",
            scripts::SET_STYLE_DISPLAY,
            vec![element.to_json(), json!(display)],
        )
        .await?;
        self.hidden_elements.remove(locator);
        Ok(())
    }

    pub async fn toggle_element_visibility(&mut self, locator: &str) -> Result<()> {
        debug!("Session: toggle_element_visibility({})", locator);
        if self.is_hidden(locator) {
            self.show_element(locator).await
        } else {
            self.hide_element(locator).await
        }
    }

    /// Whether `locator` is currently hidden by this session
    pub fn is_hidden(&self, locator: &str) -> bool {
        self.hidden_elements.contains_key(locator)
    }

    /// True when another element covers the center of the located element
    pub async fn is_element_blocked(&mut self, locator: &str) -> Result<bool> {
        debug!("Session: is_element_blocked({})", locator);
        let element = self.find_element("is_element_blocked", locator).await?;
        let blocked = self
            .run_script(
                "is_element_blocked",
                scripts::IS_ELEMENT_BLOCKED,
                vec![element.to_json()],
            )
            .await?;
        Ok(blocked.as_bool().unwrap_or(false))
    }

    pub async fn element_should_be_blocked(&mut self, locator: &str) -> Result<()> {
        if !self.is_element_blocked(locator).await? {
            return Err(TestabilityError::Assertion(format!(
                "Element with locator {} is not blocked",
                locator
            )));
        }
        Ok(())
    }

    pub async fn element_should_not_be_blocked(&mut self, locator: &str) -> Result<()> {
        if self.is_element_blocked(locator).await? {
            return Err(TestabilityError::Assertion(format!(
                "Element with locator {} is blocked",
                locator
            )));
        }
        Ok(())
    }

    pub async fn set_element_attribute(
        &mut self,
        locator: &str,
        attribute: &str,
        value: &str,
    ) -> Result<()> {
        debug!(
            "Session: set_element_attribute({}, {}, {})",
            locator, attribute, value
        );
        let element = self.find_element("set_element_attribute", locator).await?;
        self.run_script(
            "set_element_attribute",
            scripts::SET_ELEMENT_ATTRIBUTE,
            vec![element.to_json(), json!(attribute), json!(value)],
        )
        .await?;
        Ok(())
    }

    /// Drag the element at `locator` onto the element at `target`.
    ///
    /// With `html5` the drag events are dispatched by script, for pages
    /// whose drop zones only listen to `DragEvent`s. Otherwise the pointer
    /// is driven through WebDriver actions.
    pub async fn drag_and_drop(&mut self, locator: &str, target: &str, html5: bool) -> Result<()> {
        debug!(
            "Session: drag_and_drop({}, {}, {})",
            locator, target, html5
        );
        let source = self.find_element("drag_and_drop", locator).await?;
        let destination = self.find_element("drag_and_drop", target).await?;

        if html5 {
            self.run_script(
                "drag_and_drop",
                scripts::DRAG_AND_DROP,
                vec![source.to_json(), destination.to_json()],
            )
            .await?;
            return Ok(());
        }

        let (from, to) = (source.clone(), destination.clone());
        self.dispatch(
            "drag_and_drop",
            Action::DragAndDrop {
                source: &source,
                target: &destination,
            },
            move |page| async move { page.drag_and_drop(&from, &to).await },
        )
        .await
    }

    /// Topmost element at viewport coordinates, if any
    pub async fn get_webelement_at(&mut self, x: f64, y: f64) -> Result<Option<ElementHandle>> {
        debug!("Session: get_webelement_at({}, {})", x, y);
        let found = self
            .run_script(
                "get_webelement_at",
                scripts::GET_ELEMENT_AT,
                vec![json!(x), json!(y)],
            )
            .await?;
        match found {
            Value::Null => Ok(None),
            reference => ElementHandle::from_reference(&reference)
                .map(Some)
                .ok_or_else(|| {
                    TestabilityError::Other(anyhow::anyhow!(
                        "Expected an element reference, got {}",
                        reference
                    ))
                }),
        }
    }

    pub async fn scroll_to_bottom(&mut self) -> Result<()> {
        self.run_script("scroll_to_bottom", scripts::SCROLL_TO_BOTTOM, vec![])
            .await?;
        Ok(())
    }

    pub async fn scroll_to_top(&mut self) -> Result<()> {
        self.run_script("scroll_to_top", scripts::SCROLL_TO_TOP, vec![])
            .await?;
        Ok(())
    }
}

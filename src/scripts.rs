//! Scripts evaluated inside the page.
//!
//! The first four talk to the page agent; the rest back the element
//! utilities. Async scripts resolve through the last `arguments` entry.

/// Resolves `true` once the agent reports no pending work
pub const WAIT_FOR_TESTABILITY: &str = r#"
var readyCallback = arguments[arguments.length - 1];
window.testability.when.ready(function () {
    readyCallback(true);
});
"#;

/// Resolves `true` once the document has finished loading
pub const WAIT_FOR_DOCUMENT_READY: &str = r#"
var readyCallback = arguments[arguments.length - 1];
if (document.readyState === 'complete') {
    readyCallback(true);
} else {
    window.addEventListener('load', function () {
        readyCallback(true);
    });
}
"#;

/// Whether the agent is loaded in this window
pub const IS_INSTALLED: &str = r#"
return window.testability !== undefined && window.instrumentBrowser !== undefined;
"#;

/// Hands the agent its configuration before the bundle runs
pub const SET_AGENT_CONFIG: &str = r#"
window.testabilityConfig = arguments[0];
"#;

/// Attaches the agent's tracking to the current window
pub const INSTRUMENT_BROWSER: &str = r#"
window.instrumentBrowser(window);
"#;

pub const GET_STYLE_DISPLAY: &str = r#"
return arguments[0].style.display;
"#;

pub const SET_STYLE_DISPLAY: &str = r#"
arguments[0].style.display = arguments[1];
"#;

/// True unless the element itself is topmost at its center point; a
/// child covering the center counts as blocking
pub const IS_ELEMENT_BLOCKED: &str = r#"
var element = arguments[0];
var rect = element.getBoundingClientRect();
var top = document.elementFromPoint(rect.x + rect.width / 2, rect.y + rect.height / 2);
return top !== element;
"#;

/// Dispatches the HTML5 drag and drop event sequence from `arguments[0]`
/// onto `arguments[1]`, sharing one `DataTransfer` between the events
pub const DRAG_AND_DROP: &str = r#"
var source = arguments[0];
var target = arguments[1];
var transfer = new DataTransfer();
function fire(element, type) {
    var rect = element.getBoundingClientRect();
    var event = new DragEvent(type, {
        bubbles: true,
        cancelable: true,
        dataTransfer: transfer,
        clientX: rect.x + rect.width / 2,
        clientY: rect.y + rect.height / 2
    });
    element.dispatchEvent(event);
}
fire(source, 'dragstart');
fire(target, 'dragenter');
fire(target, 'dragover');
fire(target, 'drop');
fire(source, 'dragend');
"#;

pub const GET_ELEMENT_AT: &str = r#"
return document.elementFromPoint(arguments[0], arguments[1]);
"#;

pub const SET_ELEMENT_ATTRIBUTE: &str = r#"
arguments[0].setAttribute(arguments[1], arguments[2]);
"#;

pub const SCROLL_TO_BOTTOM: &str = r#"
window.scrollTo(0, document.body.scrollHeight);
"#;

pub const SCROLL_TO_TOP: &str = r#"
window.scrollTo(0, 0);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocked_check_compares_topmost_element_only() {
        assert!(IS_ELEMENT_BLOCKED.contains("return top !== element;"));
        assert!(!IS_ELEMENT_BLOCKED.contains("contains("));
    }

    #[test]
    fn test_drag_and_drop_event_order() {
        let events: Vec<&str> = DRAG_AND_DROP
            .lines()
            .filter_map(|line| line.strip_prefix("fire("))
            .filter_map(|call| call.split('\'').nth(1))
            .collect();
        assert_eq!(
            events,
            vec!["dragstart", "dragenter", "dragover", "drop", "dragend"]
        );
    }
}

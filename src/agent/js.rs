//! Injected-JS builders for the chromium page driver. Each strategy is
//! serialized to JSON and handed to a collector function evaluated in the
//! page; operation scripts re-run the collector and act on the nth match.

use serde::Deserialize;

use crate::agent::element::{ElementHandle, Strategy};

const COLLECT_HELPER: &str = r#"
function __collectMatches(strategy) {
    const results = [];
    const seen = new Set();
    const push = (el) => { if (el && !seen.has(el)) { seen.add(el); results.push(el); } };
    const textOf = (el) => ((el.innerText || el.textContent || "") + "").trim();
    const ariaOf = (el) => (el.getAttribute && el.getAttribute("aria-label")) || "";
    switch (strategy.kind) {
        case "aria_label_contains": {
            for (const el of document.querySelectorAll("[aria-label]")) {
                if (ariaOf(el).includes(strategy.value)) push(el);
            }
            break;
        }
        case "role_text": {
            const sel = strategy.role === "button"
                ? "button, [role='button']"
                : "[role='" + strategy.role + "']";
            for (const el of document.querySelectorAll(sel)) {
                if (textOf(el).includes(strategy.text) || ariaOf(el).includes(strategy.text)) push(el);
            }
            break;
        }
        case "text_contains": {
            for (const el of document.querySelectorAll("body *")) {
                if (!textOf(el).includes(strategy.value)) continue;
                let deepest = true;
                for (const child of el.children) {
                    if (textOf(child).includes(strategy.value)) { deepest = false; break; }
                }
                if (deepest) push(el);
            }
            break;
        }
        case "css": {
            for (const el of document.querySelectorAll(strategy.selector)) push(el);
            break;
        }
        case "dialog_input": {
            const scope = document.querySelector("[role='dialog']") || document;
            const inputs = scope.querySelectorAll("input:not([type='hidden'])");
            if (inputs.length > strategy.index) push(inputs[strategy.index]);
            break;
        }
    }
    return results;
}
"#;

#[derive(Debug, Deserialize)]
pub(crate) struct ClickOutcome {
    pub found: bool,
    pub clicked: bool,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FillOutcome {
    pub found: bool,
    pub filled: bool,
    #[serde(default)]
    pub reason: String,
}

fn strategy_json(strategy: &Strategy) -> String {
    serde_json::to_string(strategy).unwrap_or_else(|_| "null".to_string())
}

fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

pub(crate) fn count_script(strategy: &Strategy) -> String {
    format!(
        "(() => {{ {helper} return __collectMatches({payload}).length; }})()",
        helper = COLLECT_HELPER,
        payload = strategy_json(strategy),
    )
}

pub(crate) fn click_script(handle: &ElementHandle) -> String {
    format!(
        r#"(() => {{
            {helper}
            const matches = __collectMatches({payload});
            const el = matches[{index}];
            if (!el) return {{ found: false, clicked: false, reason: "match gone" }};
            el.scrollIntoView({{ block: "center", inline: "center" }});
            el.click();
            return {{ found: true, clicked: true, reason: "" }};
        }})()"#,
        helper = COLLECT_HELPER,
        payload = strategy_json(&handle.strategy),
        index = handle.index,
    )
}

pub(crate) fn fill_script(handle: &ElementHandle, value: &str) -> String {
    format!(
        r#"(() => {{
            {helper}
            const matches = __collectMatches({payload});
            const el = matches[{index}];
            if (!el) return {{ found: false, filled: false, reason: "match gone" }};
            const value = {value};
            const proto = el instanceof HTMLTextAreaElement
                ? HTMLTextAreaElement.prototype
                : HTMLInputElement.prototype;
            const descriptor = Object.getOwnPropertyDescriptor(proto, "value");
            if (descriptor && descriptor.set) {{
                descriptor.set.call(el, value);
            }} else {{
                el.value = value;
            }}
            el.dispatchEvent(new Event("input", {{ bubbles: true }}));
            el.dispatchEvent(new Event("change", {{ bubbles: true }}));
            return {{ found: true, filled: true, reason: "" }};
        }})()"#,
        helper = COLLECT_HELPER,
        payload = strategy_json(&handle.strategy),
        index = handle.index,
        value = js_string(value),
    )
}

pub(crate) fn read_aria_label_script(handle: &ElementHandle) -> String {
    format!(
        r#"(() => {{
            {helper}
            const el = __collectMatches({payload})[{index}];
            if (!el || !el.getAttribute) return null;
            return el.getAttribute("aria-label");
        }})()"#,
        helper = COLLECT_HELPER,
        payload = strategy_json(&handle.strategy),
        index = handle.index,
    )
}

pub(crate) fn read_text_script(handle: &ElementHandle) -> String {
    format!(
        r#"(() => {{
            {helper}
            const el = __collectMatches({payload})[{index}];
            if (!el) return null;
            return ((el.innerText || el.textContent || "") + "").trim();
        }})()"#,
        helper = COLLECT_HELPER,
        payload = strategy_json(&handle.strategy),
        index = handle.index,
    )
}

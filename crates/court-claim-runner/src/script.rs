//! JavaScript snippets evaluated in portal pages.
//!
//! Every snippet resolves a [`Selector`] to a list of elements in page
//! context and returns a plain JSON value. User-provided values (selectors,
//! input values, attribute names) only ever land inside string literals.

use court_claim::{ElementMutation, Selector};

/// Attribute used to hand a resolved element over to native input events.
pub const TARGET_ATTRIBUTE: &str = "data-court-claim-target";

/// CSS selector for the element last tagged with [`TARGET_ATTRIBUTE`].
pub fn target_css() -> String {
    format!("[{TARGET_ATTRIBUTE}]")
}

/// Expression evaluating to the array of elements `selector` designates.
pub fn element_list(selector: &Selector) -> String {
    let mut expr = format!(
        "Array.from(document.querySelectorAll('{}'))",
        sanitize_js_string(&selector.css)
    );

    if let Some(text) = &selector.text {
        expr = format!(
            "{expr}.filter(e => (e.textContent || '').trim() === '{}')",
            sanitize_js_string(text)
        );
    }

    if let Some(anchor) = &selector.left_of {
        // Nearest element whose right edge sits left of the anchor's left edge.
        expr = format!(
            r#"((list, anchors) => {{
                const a = anchors[0];
                if (!a) return [];
                const ar = a.getBoundingClientRect();
                const dist = r => (ar.left - r.right) + Math.abs(r.top - ar.top);
                return list
                    .map(e => [e, e.getBoundingClientRect()])
                    .filter(([, r]) => r.right <= ar.left + 1)
                    .sort((x, y) => dist(x[1]) - dist(y[1]))
                    .map(([e]) => e);
            }})({expr}, {anchor})"#,
            anchor = element_list(anchor)
        );
    }

    if let Some(n) = selector.nth {
        expr = format!("{expr}.slice({n}, {n} + 1)");
    }

    expr
}

/// Wrap a body that sees the first match as `el` (possibly undefined).
fn with_first(selector: &Selector, body: &str) -> String {
    format!(
        "(() => {{ const el = ({})[0]; {body} }})()",
        element_list(selector)
    )
}

/// `{ count }` for the selector.
pub fn count(selector: &Selector) -> String {
    format!(
        "(() => ({{ count: ({}).length }}))()",
        element_list(selector)
    )
}

/// `{ attached, visible }` for the first match.
pub fn element_state(selector: &Selector) -> String {
    with_first(
        selector,
        r#"if (!el) return { attached: false, visible: false };
        const style = window.getComputedStyle(el);
        const rendered = !!(el.offsetWidth || el.offsetHeight || el.getClientRects().length);
        return {
            attached: true,
            visible: rendered && style.visibility !== 'hidden' && style.display !== 'none'
        };"#,
    )
}

/// Tag the first match with [`TARGET_ATTRIBUTE`]. Returns `{ found }`.
pub fn tag_target(selector: &Selector) -> String {
    with_first(
        selector,
        &format!(
            r#"document.querySelectorAll('[{attr}]').forEach(e => e.removeAttribute('{attr}'));
        if (!el) return {{ found: false }};
        el.scrollIntoView({{ block: 'center' }});
        el.setAttribute('{attr}', '1');
        return {{ found: true }};"#,
            attr = TARGET_ATTRIBUTE
        ),
    )
}

/// Tag the focused element with [`TARGET_ATTRIBUTE`]. Returns `{ found }`.
pub fn tag_focused() -> String {
    format!(
        r#"(() => {{
            document.querySelectorAll('[{attr}]').forEach(e => e.removeAttribute('{attr}'));
            const el = document.activeElement;
            if (!el || el === document.body) return {{ found: false }};
            el.setAttribute('{attr}', '1');
            return {{ found: true }};
        }})()"#,
        attr = TARGET_ATTRIBUTE
    )
}

/// Set the value of the first match and fire `input` and `change`.
pub fn fill(selector: &Selector, value: &str) -> String {
    with_first(
        selector,
        &format!(
            r#"if (!el) return {{ found: false }};
        el.focus();
        el.value = '{}';
        el.dispatchEvent(new Event('input', {{ bubbles: true }}));
        el.dispatchEvent(new Event('change', {{ bubbles: true }}));
        return {{ found: true }};"#,
            sanitize_js_string(value)
        ),
    )
}

/// `{ found, value }` with an attribute of the first match.
pub fn attribute(selector: &Selector, name: &str) -> String {
    with_first(
        selector,
        &format!(
            "if (!el) return {{ found: false, value: null }};
        return {{ found: true, value: el.getAttribute('{}') }};",
            sanitize_js_string(name)
        ),
    )
}

/// `{ found, value }` with the text content of the first match.
pub fn text_content(selector: &Selector) -> String {
    with_first(
        selector,
        "if (!el) return { found: false, value: null };
        return { found: true, value: el.textContent || '' };",
    )
}

/// `{ found, value }` with the inner markup of the first match.
pub fn inner_html(selector: &Selector) -> String {
    with_first(
        selector,
        "if (!el) return { found: false, value: null };
        return { found: true, value: el.innerHTML };",
    )
}

/// Apply `mutations` to the first match. Returns `{ found }`.
pub fn mutate(selector: &Selector, mutations: &[ElementMutation]) -> String {
    let statements: String = mutations.iter().map(mutation_statement).collect();
    with_first(
        selector,
        &format!("if (!el) return {{ found: false }};\n{statements}return {{ found: true }};"),
    )
}

fn mutation_statement(mutation: &ElementMutation) -> String {
    match mutation {
        ElementMutation::RemoveAttribute { name } => {
            format!("el.removeAttribute('{}');\n", sanitize_js_string(name))
        }
        ElementMutation::SetStyle { property, value } => format!(
            "el.style.setProperty('{}', '{}');\n",
            sanitize_js_string(property),
            sanitize_js_string(value)
        ),
        ElementMutation::RemoveClass { class } => {
            format!("el.classList.remove('{}');\n", sanitize_js_string(class))
        }
    }
}

/// `{ title, ready }` for the current document.
pub fn document_state() -> &'static str {
    "(() => ({ title: document.title, ready: document.readyState === 'complete' }))()"
}

/// Sanitize a string for safe injection into a JavaScript string literal.
///
/// Escapes backslashes, quotes, backticks and control whitespace, strips
/// null bytes, and hex-escapes angle brackets so a value can never close
/// a surrounding script tag.
pub fn sanitize_js_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 8);
    for ch in s.chars() {
        match ch {
            '\\' => result.push_str("\\\\"),
            '\'' => result.push_str("\\'"),
            '"' => result.push_str("\\\""),
            '`' => result.push_str("\\`"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            '\0' => {}
            '<' => result.push_str("\\x3c"),
            '>' => result.push_str("\\x3e"),
            _ => result.push(ch),
        }
    }
    result
}

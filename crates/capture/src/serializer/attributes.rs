use crate::config::CaptureConfig;
use crate::record::{AttributeValue, Attributes};
use crate::url_rewrite::{absolute_url, transform_attribute};
use dom::{Dom, NodeRef};

/// Base URL for resolving attribute values of `node`.
pub(crate) fn base_url(dom: &Dom, node: NodeRef) -> Option<&str> {
    dom.owner_document(node)
        .and_then(|doc| dom.document_url(doc))
}

/// Attribute record of an element: markup attributes plus the synthetic
/// fields derived from host live state.
pub(crate) fn element_attributes(dom: &Dom, config: &CaptureConfig, node: NodeRef) -> Attributes {
    let base = base_url(dom, node);
    let mut attributes: Attributes = dom
        .attributes(node)
        .iter()
        .map(|(name, value)| {
            (
                name.clone(),
                AttributeValue::Text(transform_attribute(base, name, value)),
            )
        })
        .collect();

    let scroll = dom.scroll(node);
    if scroll.left != 0.0 {
        attributes.insert("_scrollLeft".into(), scroll.left.into());
    }
    if scroll.top != 0.0 {
        attributes.insert("_scrollTop".into(), scroll.top.into());
    }
    if let Some(rect) = dom.rect(node) {
        attributes.insert("_width".into(), format!("{}px", rect.width).into());
        attributes.insert("_height".into(), format!("{}px", rect.height).into());
    }

    let tag = dom.tag_name(node).unwrap_or_default();
    match tag {
        "link" if config.inline_stylesheets => {
            let css = dom
                .attribute(node, "href")
                .map(|href| absolute_url(base, href))
                .and_then(|href| dom.stylesheet(&href));
            if let Some(css) = css.filter(|css| !css.is_empty()) {
                attributes.remove("rel");
                attributes.remove("href");
                attributes.insert("cssText".into(), css.into());
            }
        }
        "style" if config.inline_stylesheets => {
            if let Some(css) = dom.sheet(node).filter(|css| !css.is_empty()) {
                attributes.insert("cssText".into(), css.into());
            }
        }
        "input" | "textarea" | "select" => form_control(dom, node, &mut attributes),
        "option" => option_selection(dom, node, &mut attributes),
        "canvas" if config.record_canvas => {
            if let Some(data_url) = dom.canvas_data_url(node) {
                attributes.insert("_dataURL".into(), data_url.into());
            }
        }
        "audio" | "video" if config.record_media => {
            let state = if dom.paused(node) { "paused" } else { "played" };
            attributes.insert("_mediaState".into(), state.into());
        }
        _ => {}
    }
    attributes
}

fn form_control(dom: &Dom, node: NodeRef, attributes: &mut Attributes) {
    let toggle = matches!(
        attributes.get("type").and_then(AttributeValue::as_str),
        Some("radio" | "checkbox")
    );
    let value = dom.value(node);
    if !toggle && !value.is_empty() {
        attributes.insert("value".into(), value.into());
    } else if dom.checked(node) {
        attributes.insert("checked".into(), true.into());
    }
}

/// `selected` is only recorded on the option whose value is the value of its
/// select.
fn option_selection(dom: &Dom, node: NodeRef, attributes: &mut Attributes) {
    let Some(select) = enclosing_select(dom, node) else {
        return;
    };
    // an option without a value attribute takes its value from its text
    if dom.value(node) == dom.value(select) {
        attributes.insert("selected".into(), dom.selected(node).into());
    }
}

fn enclosing_select(dom: &Dom, option: NodeRef) -> Option<NodeRef> {
    let parent = dom.parent(option)?;
    if dom.is_element_named(parent, "select") {
        return Some(parent);
    }
    if dom.is_element_named(parent, "optgroup") {
        return dom
            .parent(parent)
            .filter(|grand| dom.is_element_named(*grand, "select"));
    }
    None
}

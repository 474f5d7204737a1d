use crate::{Dom, DomError, MutationRecord, NodeKind, ReadyState};

fn page() -> (Dom, crate::NodeRef, crate::NodeRef) {
    let mut dom = Dom::new("https://example.com/index.html");
    let doc = dom.document();
    let html = dom.create_element(doc, "html");
    let body = dom.create_element(doc, "BODY");
    dom.append_child(doc, html).unwrap();
    dom.append_child(html, body).unwrap();
    dom.take_records();
    (dom, html, body)
}

#[test]
fn names_are_lowercased() {
    let (dom, _, body) = page();
    assert_eq!(dom.tag_name(body), Some("body"));
}

#[test]
fn append_to_connected_parent_is_observed() {
    let (mut dom, _, body) = page();
    let doc = dom.document();
    let div = dom.create_element(doc, "div");
    dom.append_child(body, div).unwrap();

    assert_eq!(
        dom.take_records(),
        vec![MutationRecord::ChildList {
            target: body,
            added: vec![div],
            removed: vec![],
        }]
    );
    assert!(dom.take_records().is_empty());
}

#[test]
fn building_a_detached_subtree_is_not_observed() {
    let (mut dom, _, body) = page();
    let doc = dom.document();
    let div = dom.create_element(doc, "div");
    let span = dom.create_element(doc, "span");
    dom.append_child(div, span).unwrap();
    dom.set_attribute(span, "title", "x").unwrap();
    assert!(dom.pending_records().is_empty());
    assert!(!dom.is_connected(span));

    dom.append_child(body, div).unwrap();
    assert!(dom.is_connected(span));
    assert_eq!(dom.take_records().len(), 1);
}

#[test]
fn moving_a_node_reports_removal_then_addition() {
    let (mut dom, _, body) = page();
    let doc = dom.document();
    let a = dom.create_element(doc, "div");
    let b = dom.create_element(doc, "div");
    let n = dom.create_element(doc, "p");
    dom.append_child(body, a).unwrap();
    dom.append_child(body, b).unwrap();
    dom.append_child(a, n).unwrap();
    dom.take_records();

    dom.append_child(b, n).unwrap();
    assert_eq!(
        dom.take_records(),
        vec![
            MutationRecord::ChildList {
                target: a,
                added: vec![],
                removed: vec![n],
            },
            MutationRecord::ChildList {
                target: b,
                added: vec![n],
                removed: vec![],
            },
        ]
    );
    assert_eq!(dom.parent(n), Some(b));
    assert!(dom.children(a).is_empty());
}

#[test]
fn insert_before_places_child_and_tracks_siblings() {
    let (mut dom, _, body) = page();
    let doc = dom.document();
    let first = dom.create_element(doc, "h1");
    let last = dom.create_element(doc, "footer");
    dom.append_child(body, last).unwrap();
    dom.insert_before(body, first, Some(last)).unwrap();

    assert_eq!(dom.children(body), &[first, last]);
    assert_eq!(dom.next_sibling(first), Some(last));
    assert_eq!(dom.previous_sibling(last), Some(first));
    assert_eq!(dom.next_sibling(last), None);
    assert_eq!(dom.previous_sibling(first), None);
}

#[test]
fn insert_before_rejects_foreign_reference() {
    let (mut dom, html, body) = page();
    let doc = dom.document();
    let div = dom.create_element(doc, "div");
    assert_eq!(
        dom.insert_before(body, div, Some(html)),
        Err(DomError::InvalidSibling {
            parent: body,
            before: html
        })
    );
}

#[test]
fn cycles_are_rejected() {
    let (mut dom, html, body) = page();
    assert_eq!(
        dom.append_child(body, html),
        Err(DomError::CycleDetected {
            parent: body,
            child: html
        })
    );
    assert_eq!(
        dom.append_child(body, body),
        Err(DomError::CycleDetected {
            parent: body,
            child: body
        })
    );
}

#[test]
fn text_nodes_cannot_have_children() {
    let (mut dom, _, _) = page();
    let doc = dom.document();
    let text = dom.create_text(doc, "hi");
    let span = dom.create_element(doc, "span");
    assert_eq!(dom.append_child(text, span), Err(DomError::InvalidParent(text)));
}

#[test]
fn remove_child_requires_parent_relation() {
    let (mut dom, html, body) = page();
    let doc = dom.document();
    let div = dom.create_element(doc, "div");
    dom.append_child(body, div).unwrap();
    assert_eq!(
        dom.remove_child(html, div),
        Err(DomError::NotAChild {
            parent: html,
            child: div
        })
    );
    dom.take_records();
    dom.remove_child(body, div).unwrap();
    assert_eq!(
        dom.take_records(),
        vec![MutationRecord::ChildList {
            target: body,
            added: vec![],
            removed: vec![div],
        }]
    );
    assert_eq!(dom.parent(div), None);
}

#[test]
fn attribute_changes_carry_old_values() {
    let (mut dom, _, body) = page();
    dom.set_attribute(body, "Class", "a").unwrap();
    dom.set_attribute(body, "class", "b").unwrap();
    dom.remove_attribute(body, "class").unwrap();
    dom.remove_attribute(body, "class").unwrap();

    assert_eq!(
        dom.take_records(),
        vec![
            MutationRecord::Attributes {
                target: body,
                name: "class".to_string(),
                old_value: None,
            },
            MutationRecord::Attributes {
                target: body,
                name: "class".to_string(),
                old_value: Some("a".to_string()),
            },
            MutationRecord::Attributes {
                target: body,
                name: "class".to_string(),
                old_value: Some("b".to_string()),
            },
        ]
    );
    assert_eq!(dom.attribute(body, "class"), None);
}

#[test]
fn text_changes_carry_old_values() {
    let (mut dom, _, body) = page();
    let doc = dom.document();
    let text = dom.create_text(doc, "one");
    dom.append_child(body, text).unwrap();
    dom.take_records();

    dom.set_text(text, "two").unwrap();
    assert_eq!(
        dom.take_records(),
        vec![MutationRecord::CharacterData {
            target: text,
            old_value: Some("one".to_string()),
        }]
    );
    assert_eq!(dom.set_text(body, "x"), Err(DomError::WrongNodeKind(body)));
}

#[test]
fn class_lookup_matches_whole_tokens() {
    let (mut dom, _, body) = page();
    dom.set_attribute(body, "class", "page norecord-ish  norecord").unwrap();
    assert!(dom.has_class(body, "norecord"));
    assert!(dom.has_class(body, "page"));
    assert!(!dom.has_class(body, "norec"));
}

#[test]
fn form_values_fall_back_to_markup() {
    let (mut dom, _, body) = page();
    let doc = dom.document();
    let input = dom.create_element_with(doc, "input", &[("value", "hello")]);
    let check = dom.create_element_with(doc, "input", &[("type", "checkbox"), ("checked", "")]);
    let area = dom.create_element(doc, "textarea");
    let area_text = dom.create_text(doc, "notes");
    dom.append_child(area, area_text).unwrap();
    for node in [input, check, area] {
        dom.append_child(body, node).unwrap();
    }

    assert_eq!(dom.value(input), "hello");
    assert_eq!(dom.value(area), "notes");
    assert!(dom.checked(check));

    dom.set_value(input, "typed").unwrap();
    dom.set_checked(check, false).unwrap();
    assert_eq!(dom.value(input), "typed");
    assert!(!dom.checked(check));
    assert_eq!(dom.take_records().len(), 3, "live state is not observed");
}

#[test]
fn select_value_follows_selected_option() {
    let (mut dom, _, body) = page();
    let doc = dom.document();
    let select = dom.create_element(doc, "select");
    let a = dom.create_element_with(doc, "option", &[("value", "a")]);
    let group = dom.create_element(doc, "optgroup");
    let b = dom.create_element_with(doc, "option", &[("value", "b")]);
    let c = dom.create_element(doc, "option");
    let c_text = dom.create_text(doc, "see");
    dom.append_child(c, c_text).unwrap();
    dom.append_child(select, a).unwrap();
    dom.append_child(select, group).unwrap();
    dom.append_child(group, b).unwrap();
    dom.append_child(select, c).unwrap();
    dom.append_child(body, select).unwrap();

    assert_eq!(dom.value(select), "a");
    dom.set_selected(b, true).unwrap();
    assert_eq!(dom.value(select), "b");
    dom.set_selected(b, false).unwrap();
    dom.set_attribute(c, "selected", "").unwrap();
    assert_eq!(dom.value(select), "see");
}

#[test]
fn frames_link_both_ways() {
    let (mut dom, _, body) = page();
    let doc = dom.document();
    let iframe = dom.create_element(doc, "iframe");
    dom.append_child(body, iframe).unwrap();
    let inner = dom.create_document("https://example.com/frame.html");

    assert_eq!(dom.ready_state(inner), Some(ReadyState::Loading));
    assert_eq!(dom.ready_state(doc), Some(ReadyState::Complete));

    dom.attach_frame(iframe, inner).unwrap();
    assert_eq!(dom.frame_document(iframe), Some(inner));
    assert_eq!(dom.frame_host(inner), Some(iframe));
    assert!(dom.is_connected(inner));

    let inner_html = dom.create_element(inner, "html");
    assert_eq!(dom.owner_document(inner_html), Some(inner));

    let replacement = dom.create_document("about:blank");
    dom.attach_frame(iframe, replacement).unwrap();
    assert_eq!(dom.frame_host(inner), None);
    assert_eq!(dom.frame_host(replacement), Some(iframe));
}

#[test]
fn documents_cannot_be_inserted() {
    let (mut dom, _, body) = page();
    let other = dom.create_document("about:blank");
    assert_eq!(dom.append_child(body, other), Err(DomError::WrongNodeKind(other)));
    assert!(matches!(dom.kind(other), Some(NodeKind::Document { .. })));
}

#[test]
fn media_starts_paused() {
    let (mut dom, _, body) = page();
    let doc = dom.document();
    let video = dom.create_element(doc, "video");
    dom.append_child(body, video).unwrap();
    assert!(dom.paused(video));
    dom.set_paused(video, false).unwrap();
    assert!(!dom.paused(video));
}

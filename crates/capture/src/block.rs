use dom::{Dom, NodeRef};

/// Whether `node` or any of its ancestors carries `class`.
pub fn is_blocked(dom: &Dom, node: NodeRef, class: &str) -> bool {
    let mut current = Some(node);
    while let Some(n) = current {
        if dom.has_class(n, class) {
            return true;
        }
        current = dom.parent(n);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_on_ancestor_blocks_descendants() {
        let mut dom = Dom::new("https://example.com/");
        let doc = dom.document();
        let outer = dom.create_element_with(doc, "div", &[("class", "card norecord")]);
        let inner = dom.create_element(doc, "span");
        let text = dom.create_text(doc, "secret");
        let sibling = dom.create_element(doc, "p");
        dom.append_child(doc, outer).unwrap();
        dom.append_child(outer, inner).unwrap();
        dom.append_child(inner, text).unwrap();

        assert!(is_blocked(&dom, outer, "norecord"));
        assert!(is_blocked(&dom, text, "norecord"));
        assert!(!is_blocked(&dom, sibling, "norecord"));
        assert!(!is_blocked(&dom, inner, "card-body"));
    }
}

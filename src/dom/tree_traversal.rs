use super::*;

impl Dom {
    /// Every element below `node_id` in document order, `node_id` included
    /// when it is itself an element.
    pub(crate) fn elements_in(&self, node_id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.push_elements(node_id, &mut out);
        out
    }

    fn push_elements(&self, node_id: NodeId, out: &mut Vec<NodeId>) {
        stacker::maybe_grow(DOM_STACK_RED_ZONE, DOM_STACK_GROWTH, || {
            let node = &self.nodes[node_id.0];
            if node.element().is_some() {
                out.push(node_id);
            }
            for child in &node.children {
                self.push_elements(*child, out);
            }
        })
    }

    /// First match in document order. A bare `#id` is answered from the id
    /// index.
    pub(crate) fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        let list = parse_selector_list(selector)?;
        if let [single] = list.as_slice() {
            if let Some(id) = single.as_id() {
                return Ok(self.by_id(id));
            }
        }
        Ok(self.select(self.elements_in(self.root), &list).into_iter().next())
    }

    /// Every match in document order, duplicated ids included.
    pub(crate) fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let list = parse_selector_list(selector)?;
        Ok(self.select(self.elements_in(self.root), &list))
    }

    /// Like [`query_selector_all`](Self::query_selector_all), restricted to
    /// strict descendants of `scope`.
    pub(crate) fn query_selector_all_from(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>> {
        let list = parse_selector_list(selector)?;
        let mut candidates = self.elements_in(scope);
        if candidates.first() == Some(&scope) {
            candidates.remove(0);
        }
        Ok(self.select(candidates, &list))
    }

    fn select(&self, candidates: Vec<NodeId>, list: &[ComplexSelector]) -> Vec<NodeId> {
        candidates
            .into_iter()
            .filter(|node| self.matches_list(*node, list))
            .collect()
    }

    pub(crate) fn text_content(&self, node_id: NodeId) -> String {
        let mut out = String::new();
        self.push_text(node_id, &mut out);
        out
    }

    fn push_text(&self, node_id: NodeId, out: &mut String) {
        stacker::maybe_grow(DOM_STACK_RED_ZONE, DOM_STACK_GROWTH, || {
            let node = &self.nodes[node_id.0];
            if let NodeType::Text(text) = &node.node_type {
                out.push_str(text);
            }
            for child in &node.children {
                self.push_text(*child, out);
            }
        })
    }

    /// Serializes a node as HTML. Attributes are sorted by name so the
    /// output is stable.
    pub(crate) fn dump_node(&self, node_id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(node_id, false, &mut out);
        out
    }

    fn write_node(&self, node_id: NodeId, raw_text: bool, out: &mut String) {
        stacker::maybe_grow(DOM_STACK_RED_ZONE, DOM_STACK_GROWTH, || {
            let node = &self.nodes[node_id.0];
            let element = match &node.node_type {
                NodeType::Text(text) => {
                    if raw_text {
                        out.push_str(text);
                    } else {
                        escape_html_into(out, text, false);
                    }
                    return;
                }
                NodeType::Document => None,
                NodeType::Element(element) => Some(element),
            };

            if let Some(element) = element {
                out.push('<');
                out.push_str(&element.tag_name);
                let mut attrs = element.attrs.iter().collect::<Vec<_>>();
                attrs.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));
                for (name, value) in attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    escape_html_into(out, value, true);
                    out.push('"');
                }
                out.push('>');
                if is_void_tag(&element.tag_name) {
                    return;
                }
            }

            let raw_children = element.is_some_and(|element| is_raw_text_tag(&element.tag_name));
            for child in &node.children {
                self.write_node(*child, raw_children, out);
            }

            if let Some(element) = element {
                out.push_str("</");
                out.push_str(&element.tag_name);
                out.push('>');
            }
        })
    }
}

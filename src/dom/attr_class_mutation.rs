use super::*;

impl Dom {
    fn element_or_err(&mut self, node_id: NodeId, target: &str) -> Result<&mut Element> {
        self.element_mut(node_id)
            .ok_or_else(|| Error::NotAnElement(format!("{target} target")))
    }

    /// Attribute names are case-insensitive.
    pub(crate) fn attr(&self, node_id: NodeId, name: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();
        self.element(node_id)?.attrs.get(&name).cloned()
    }

    pub(crate) fn set_attr(&mut self, node_id: NodeId, name: &str, value: &str) -> Result<()> {
        let name = name.to_ascii_lowercase();
        let reindex = name == "id";
        self.element_or_err(node_id, "setAttribute")?
            .attrs
            .insert(name, value.to_string());
        if reindex {
            self.rebuild_id_index();
        }
        Ok(())
    }

    pub(crate) fn remove_attr(&mut self, node_id: NodeId, name: &str) -> Result<()> {
        let name = name.to_ascii_lowercase();
        let removed = self
            .element_or_err(node_id, "removeAttribute")?
            .attrs
            .remove(&name)
            .is_some();
        if removed && name == "id" {
            self.rebuild_id_index();
        }
        Ok(())
    }

    pub(crate) fn class_contains(&self, node_id: NodeId, class_name: &str) -> Result<bool> {
        self.element(node_id)
            .map(|element| element.has_class(class_name))
            .ok_or_else(|| Error::NotAnElement("classList target".into()))
    }

    pub(crate) fn class_add(&mut self, node_id: NodeId, class_name: &str) -> Result<()> {
        self.element_or_err(node_id, "classList")?
            .toggle_class(class_name, true);
        Ok(())
    }

    pub(crate) fn class_remove(&mut self, node_id: NodeId, class_name: &str) -> Result<()> {
        self.element_or_err(node_id, "classList")?
            .toggle_class(class_name, false);
        Ok(())
    }

    /// Copies the children of `source_root` in `source` under `parent`,
    /// appending them after its existing children.
    pub(crate) fn adopt_children(&mut self, parent: NodeId, source: &Dom, source_root: NodeId) -> Result<()> {
        if parent != self.root && self.element(parent).is_none() {
            return Err(Error::NotAnElement("append target".into()));
        }
        for child in &source.nodes[source_root.0].children {
            self.copy_subtree(parent, source, *child);
        }
        self.rebuild_id_index();
        Ok(())
    }

    fn copy_subtree(&mut self, parent: NodeId, source: &Dom, node_id: NodeId) {
        stacker::maybe_grow(DOM_STACK_RED_ZONE, DOM_STACK_GROWTH, || {
            let node = &source.nodes[node_id.0];
            let copy = self.create_node(Some(parent), node.node_type.clone());
            for child in &node.children {
                self.copy_subtree(copy, source, *child);
            }
        })
    }
}

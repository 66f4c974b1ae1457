use super::*;

mod attr_class_mutation;
mod selector_matching;
mod tree_traversal;

// Recursive walks call `stacker::maybe_grow` with these limits so deeply
// nested documents do not overflow the native stack.
pub(crate) const DOM_STACK_RED_ZONE: usize = 64 * 1024;
pub(crate) const DOM_STACK_GROWTH: usize = 4 * 1024 * 1024;

impl Dom {
    pub(crate) fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                node_type: NodeType::Document,
            }],
            root: NodeId(0),
            id_index: HashMap::new(),
        }
    }

    /// Appends a node to the arena, linking it as the last child of `parent`.
    pub(crate) fn create_node(&mut self, parent: Option<NodeId>, node_type: NodeType) -> NodeId {
        let node_id = NodeId(self.nodes.len());
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(node_id);
        }
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            node_type,
        });
        node_id
    }

    // Elements are created in document order while parsing, so appending to
    // the index keeps each id's entries ordered.
    pub(crate) fn create_element(
        &mut self,
        parent: NodeId,
        tag_name: String,
        attrs: HashMap<String, String>,
    ) -> NodeId {
        let id_attr = attrs.get("id").filter(|id| !id.is_empty()).cloned();
        let node_id = self.create_node(Some(parent), NodeType::Element(Element { tag_name, attrs }));
        if let Some(id_attr) = id_attr {
            self.id_index.entry(id_attr).or_default().push(node_id);
        }
        node_id
    }

    pub(crate) fn create_text(&mut self, parent: NodeId, text: String) -> NodeId {
        self.create_node(Some(parent), NodeType::Text(text))
    }

    pub(crate) fn element(&self, node_id: NodeId) -> Option<&Element> {
        self.nodes.get(node_id.0).and_then(Node::element)
    }

    pub(crate) fn element_mut(&mut self, node_id: NodeId) -> Option<&mut Element> {
        self.nodes.get_mut(node_id.0).and_then(Node::element_mut)
    }

    pub(crate) fn tag_name(&self, node_id: NodeId) -> Option<&str> {
        self.element(node_id).map(|element| element.tag_name.as_str())
    }

    pub(crate) fn parent(&self, node_id: NodeId) -> Option<NodeId> {
        self.nodes.get(node_id.0).and_then(|node| node.parent)
    }

    /// First element in document order whose `id` equals `id`.
    pub(crate) fn by_id(&self, id: &str) -> Option<NodeId> {
        self.id_index.get(id)?.first().copied()
    }

    pub(crate) fn rebuild_id_index(&mut self) {
        let mut index: HashMap<String, Vec<NodeId>> = HashMap::new();
        for node_id in self.elements_in(self.root) {
            if let Some(id) = self.attr(node_id, "id").filter(|id| !id.is_empty()) {
                index.entry(id).or_default().push(node_id);
            }
        }
        self.id_index = index;
    }
}

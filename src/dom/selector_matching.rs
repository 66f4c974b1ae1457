use super::*;

impl Dom {
    pub(crate) fn matches_list(&self, node_id: NodeId, list: &[ComplexSelector]) -> bool {
        list.iter()
            .any(|complex| self.matches_parts(node_id, &complex.parts))
    }

    // Matches the rightmost compound at `node_id`, then walks leftwards. A
    // failed branch backtracks to the next ancestor or sibling candidate.
    fn matches_parts(&self, node_id: NodeId, parts: &[(Option<Combinator>, CompoundSelector)]) -> bool {
        let Some(((combinator, compound), rest)) = parts.split_last() else {
            return false;
        };
        if !self.matches_compound(node_id, compound) {
            return false;
        }
        let Some(combinator) = combinator else {
            return rest.is_empty();
        };
        match combinator {
            Combinator::Child => self
                .parent_element(node_id)
                .is_some_and(|parent| self.matches_parts(parent, rest)),
            Combinator::Descendant => {
                let mut cursor = self.parent_element(node_id);
                while let Some(ancestor) = cursor {
                    if self.matches_parts(ancestor, rest) {
                        return true;
                    }
                    cursor = self.parent_element(ancestor);
                }
                false
            }
            Combinator::NextSibling => self
                .element_sibling(node_id, SiblingDirection::Previous)
                .is_some_and(|sibling| self.matches_parts(sibling, rest)),
            Combinator::LaterSibling => {
                let mut cursor = self.element_sibling(node_id, SiblingDirection::Previous);
                while let Some(sibling) = cursor {
                    if self.matches_parts(sibling, rest) {
                        return true;
                    }
                    cursor = self.element_sibling(sibling, SiblingDirection::Previous);
                }
                false
            }
        }
    }

    fn matches_compound(&self, node_id: NodeId, compound: &CompoundSelector) -> bool {
        let Some(element) = self.element(node_id) else {
            return false;
        };
        let attr = |name: &str| element.attrs.get(name).map(String::as_str);

        compound
            .tag
            .as_deref()
            .is_none_or(|tag| element.tag_name.eq_ignore_ascii_case(tag))
            && compound.id.as_deref().is_none_or(|id| attr("id") == Some(id))
            && compound.classes.iter().all(|class| element.has_class(class))
            && compound.attrs.iter().all(|cond| cond.matches(attr(&cond.name)))
            && compound.pseudo_classes.iter().all(|pseudo| match pseudo {
                PseudoClass::FirstChild => self
                    .element_sibling(node_id, SiblingDirection::Previous)
                    .is_none(),
                PseudoClass::LastChild => self
                    .element_sibling(node_id, SiblingDirection::Next)
                    .is_none(),
                PseudoClass::Not(inner) => !self.matches_list(node_id, inner),
            })
    }

    fn parent_element(&self, node_id: NodeId) -> Option<NodeId> {
        self.parent(node_id)
            .filter(|parent| self.element(*parent).is_some())
    }

    fn element_sibling(&self, node_id: NodeId, direction: SiblingDirection) -> Option<NodeId> {
        let siblings = &self.nodes[self.parent(node_id)?.0].children;
        let pos = siblings.iter().position(|id| *id == node_id)?;
        let is_element = |id: &&NodeId| self.element(**id).is_some();
        match direction {
            SiblingDirection::Previous => siblings[..pos].iter().rev().find(is_element),
            SiblingDirection::Next => siblings[pos + 1..].iter().find(is_element),
        }
        .copied()
    }
}

#[derive(Debug, Clone, Copy)]
enum SiblingDirection {
    Previous,
    Next,
}

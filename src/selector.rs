use super::*;

/// A comma-separated selector list. An element matches when any entry does.
pub(crate) type SelectorList = Vec<ComplexSelector>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Combinator {
    Descendant,
    Child,
    NextSibling,
    LaterSibling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AttrOperator {
    Exists,
    Equals,
    Prefix,
    Suffix,
    Substring,
    Includes,
    DashMatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AttrSelector {
    pub(crate) name: String,
    pub(crate) op: AttrOperator,
    pub(crate) value: String,
}

impl AttrSelector {
    pub(crate) fn matches(&self, actual: Option<&str>) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        let value = self.value.as_str();
        match self.op {
            AttrOperator::Exists => true,
            AttrOperator::Equals => actual == value,
            // An empty operand never matches the substring operators.
            AttrOperator::Prefix => !value.is_empty() && actual.starts_with(value),
            AttrOperator::Suffix => !value.is_empty() && actual.ends_with(value),
            AttrOperator::Substring => !value.is_empty() && actual.contains(value),
            AttrOperator::Includes => actual.split_whitespace().any(|token| token == value),
            AttrOperator::DashMatch => {
                actual == value
                    || actual
                        .strip_prefix(value)
                        .is_some_and(|rest| rest.starts_with('-'))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PseudoClass {
    FirstChild,
    LastChild,
    Not(SelectorList),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CompoundSelector {
    pub(crate) tag: Option<String>,
    pub(crate) id: Option<String>,
    pub(crate) classes: Vec<String>,
    pub(crate) attrs: Vec<AttrSelector>,
    pub(crate) pseudo_classes: Vec<PseudoClass>,
}

/// Compounds joined by combinators, left to right. The first entry has no
/// combinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ComplexSelector {
    pub(crate) parts: Vec<(Option<Combinator>, CompoundSelector)>,
}

impl ComplexSelector {
    /// `Some(id)` for a bare `#id`, which can be answered from the id index.
    pub(crate) fn as_id(&self) -> Option<&str> {
        let [(None, compound)] = self.parts.as_slice() else {
            return None;
        };
        let bare = compound.tag.is_none()
            && compound.classes.is_empty()
            && compound.attrs.is_empty()
            && compound.pseudo_classes.is_empty();
        if bare { compound.id.as_deref() } else { None }
    }
}

pub(crate) fn parse_selector_list(selector: &str) -> Result<SelectorList> {
    let mut parser = SelectorParser {
        src: selector,
        pos: 0,
    };
    parser
        .list(None)
        .ok_or_else(|| Error::UnsupportedSelector(selector.to_string()))
}

// Every production returns `None` on malformed input; the caller reports the
// whole selector.
struct SelectorParser<'a> {
    src: &'a str,
    pos: usize,
}

impl SelectorParser<'_> {
    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn list(&mut self, close: Option<u8>) -> Option<SelectorList> {
        let mut list = Vec::new();
        loop {
            self.skip_ws();
            list.push(self.complex()?);
            self.skip_ws();
            match self.peek() {
                Some(b',') => self.pos += 1,
                next if next == close => {
                    if close.is_some() {
                        self.pos += 1;
                    }
                    return Some(list);
                }
                _ => return None,
            }
        }
    }

    fn complex(&mut self) -> Option<ComplexSelector> {
        let mut parts = vec![(None, self.compound()?)];
        loop {
            let spaced = self.skip_ws();
            let combinator = match self.peek() {
                Some(b'>') => Combinator::Child,
                Some(b'+') => Combinator::NextSibling,
                Some(b'~') => Combinator::LaterSibling,
                Some(b',' | b')') | None => break,
                Some(_) if spaced => Combinator::Descendant,
                Some(_) => return None,
            };
            if combinator != Combinator::Descendant {
                self.pos += 1;
                self.skip_ws();
            }
            parts.push((Some(combinator), self.compound()?));
        }
        Some(ComplexSelector { parts })
    }

    fn compound(&mut self) -> Option<CompoundSelector> {
        let start = self.pos;
        let mut compound = CompoundSelector::default();
        if !self.eat(b'*') {
            if let Some(tag) = self.ident() {
                compound.tag = Some(tag.to_ascii_lowercase());
            }
        }
        loop {
            match self.peek() {
                Some(b'#') => {
                    self.pos += 1;
                    let id = self.ident()?;
                    if compound.id.replace(id).is_some() {
                        return None;
                    }
                }
                Some(b'.') => {
                    self.pos += 1;
                    compound.classes.push(self.ident()?);
                }
                Some(b'[') => {
                    self.pos += 1;
                    compound.attrs.push(self.attr()?);
                }
                Some(b':') => {
                    self.pos += 1;
                    compound.pseudo_classes.push(self.pseudo()?);
                }
                _ => break,
            }
        }
        (self.pos > start).then_some(compound)
    }

    fn ident(&mut self) -> Option<String> {
        let start = self.pos;
        // Bytes >= 0x80 belong to non-ASCII characters, which are valid
        // identifier characters.
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b >= 0x80)
        {
            self.pos += 1;
        }
        (self.pos > start).then(|| self.src[start..self.pos].to_string())
    }

    fn attr(&mut self) -> Option<AttrSelector> {
        self.skip_ws();
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':'))
        {
            self.pos += 1;
        }
        if self.pos == start {
            return None;
        }
        let name = self.src[start..self.pos].to_ascii_lowercase();
        self.skip_ws();

        if self.eat(b']') {
            return Some(AttrSelector {
                name,
                op: AttrOperator::Exists,
                value: String::new(),
            });
        }

        let op = match self.peek()? {
            b'=' => AttrOperator::Equals,
            b'^' => AttrOperator::Prefix,
            b'$' => AttrOperator::Suffix,
            b'*' => AttrOperator::Substring,
            b'~' => AttrOperator::Includes,
            b'|' => AttrOperator::DashMatch,
            _ => return None,
        };
        self.pos += 1;
        if op != AttrOperator::Equals && !self.eat(b'=') {
            return None;
        }
        self.skip_ws();
        let value = match self.peek()? {
            quote @ (b'"' | b'\'') => {
                self.pos += 1;
                let (value, closed) = self.escaped_until(|ch| ch == char::from(quote));
                if !closed {
                    return None;
                }
                self.pos += 1;
                value
            }
            _ => self.escaped_until(|ch| ch.is_ascii_whitespace() || ch == ']').0,
        };
        self.skip_ws();
        self.eat(b']').then_some(AttrSelector { name, op, value })
    }

    // Reads up to the first unescaped terminator and leaves it in place.
    // The flag is false when the input ran out first.
    fn escaped_until(&mut self, is_end: impl Fn(char) -> bool) -> (String, bool) {
        let mut out = String::new();
        let mut chars = self.src[self.pos..].char_indices();
        while let Some((offset, ch)) = chars.next() {
            if is_end(ch) {
                self.pos += offset;
                return (out, true);
            }
            if ch == '\\' {
                if let Some((_, escaped)) = chars.next() {
                    out.push(escaped);
                }
                continue;
            }
            out.push(ch);
        }
        self.pos = self.src.len();
        (out, false)
    }

    fn pseudo(&mut self) -> Option<PseudoClass> {
        let name = self.ident()?;
        match name.to_ascii_lowercase().as_str() {
            "first-child" => Some(PseudoClass::FirstChild),
            "last-child" => Some(PseudoClass::LastChild),
            "not" if self.eat(b'(') => Some(PseudoClass::Not(self.list(Some(b')'))?)),
            _ => None,
        }
    }
}

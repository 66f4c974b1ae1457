use super::*;

pub(crate) fn parse_html(html: &str) -> Result<Dom> {
    let mut dom = Dom::new();
    let root = dom.root;
    parse_html_into(&mut dom, root, html)?;
    Ok(dom)
}

/// Parses `html` and appends the resulting nodes under `parent`.
pub(crate) fn parse_html_into(dom: &mut Dom, parent: NodeId, html: &str) -> Result<()> {
    TreeBuilder {
        src: html,
        pos: 0,
        dom,
        open: vec![parent],
    }
    .run()
}

pub(crate) fn is_void_tag(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Elements whose content is text up to the matching end tag.
pub(crate) fn is_raw_text_tag(tag: &str) -> bool {
    matches!(tag, "script" | "style" | "title" | "textarea")
}

// Character references are left undecoded inside these.
fn keeps_references(tag: &str) -> bool {
    matches!(tag, "script" | "style")
}

/// For a start tag that implicitly ends an open element: the tags it closes,
/// and the ancestors that stop the search.
fn implied_end(tag: &str) -> Option<(&'static [&'static str], &'static [&'static str])> {
    let rule: (&[&str], &[&str]) = match tag {
        "li" => (&["li"], &["ol", "ul", "menu"]),
        "dt" | "dd" => (&["dt", "dd"], &["dl"]),
        "option" | "optgroup" => (&["option"], &["optgroup", "select", "datalist"]),
        "address" | "article" | "aside" | "blockquote" | "details" | "div" | "dl"
        | "fieldset" | "figcaption" | "figure" | "footer" | "form" | "h1" | "h2" | "h3"
        | "h4" | "h5" | "h6" | "header" | "hgroup" | "hr" | "main" | "menu" | "nav" | "ol"
        | "p" | "pre" | "section" | "table" | "ul" => (&["p"], &["button"]),
        _ => return None,
    };
    Some(rule)
}

struct StartTag {
    name: String,
    attrs: HashMap<String, String>,
    self_closing: bool,
}

struct TreeBuilder<'a> {
    src: &'a str,
    pos: usize,
    dom: &'a mut Dom,
    // Open elements; the first entry is the insertion parent and never pops.
    open: Vec<NodeId>,
}

impl TreeBuilder<'_> {
    fn run(&mut self) -> Result<()> {
        while self.pos < self.src.len() {
            let rest = &self.src[self.pos..];
            if rest.starts_with("<!--") {
                let end = rest[4..]
                    .find("-->")
                    .ok_or_else(|| Error::HtmlParse("unclosed HTML comment".into()))?;
                self.pos += 4 + end + 3;
            } else if rest.starts_with("</") {
                let name = self.end_tag()?;
                self.close(&name);
            } else if rest.starts_with("<!") {
                self.declaration()?;
            } else if rest.starts_with('<') && rest.as_bytes().get(1).is_some_and(u8::is_ascii_alphabetic) {
                let tag = self.start_tag()?;
                self.insert(tag)?;
            } else {
                self.text();
            }
        }
        Ok(())
    }

    fn current(&self) -> NodeId {
        self.open.last().copied().unwrap_or(self.dom.root)
    }

    fn text(&mut self) {
        // A `<` that does not open markup is literal text.
        let rest = &self.src[self.pos..];
        let first = rest.chars().next().map_or(1, char::len_utf8);
        let len = rest[first..].find('<').map_or(rest.len(), |at| at + first);
        let decoded = decode_html_character_references(&rest[..len]);
        self.pos += len;
        if !decoded.is_empty() {
            let parent = self.current();
            self.dom.create_text(parent, decoded);
        }
    }

    fn insert(&mut self, tag: StartTag) -> Result<()> {
        if let Some((closes, boundaries)) = implied_end(&tag.name) {
            let found = self.open[1..].iter().rposition(|node| {
                self.dom
                    .tag_name(*node)
                    .is_some_and(|open| closes.contains(&open) || boundaries.contains(&open))
            });
            if let Some(index) = found.map(|index| index + 1) {
                if self.dom.tag_name(self.open[index]).is_some_and(|open| closes.contains(&open)) {
                    self.open.truncate(index);
                }
            }
        }

        let parent = self.current();
        let StartTag {
            name,
            attrs,
            self_closing,
        } = tag;
        let node = self.dom.create_element(parent, name.clone(), attrs);
        if self_closing {
            return Ok(());
        }
        if is_raw_text_tag(&name) {
            return self.raw_text(node, &name);
        }
        if !is_void_tag(&name) {
            self.open.push(node);
        }
        Ok(())
    }

    fn raw_text(&mut self, node: NodeId, name: &str) -> Result<()> {
        let body_len = find_raw_end_tag(&self.src[self.pos..], name)
            .ok_or_else(|| Error::HtmlParse(format!("unclosed <{name}>")))?;
        let body = &self.src[self.pos..self.pos + body_len];
        let text = if keeps_references(name) {
            body.to_string()
        } else {
            decode_html_character_references(body)
        };
        if !text.is_empty() {
            self.dom.create_text(node, text);
        }
        self.pos += body_len;
        self.end_tag()?;
        Ok(())
    }

    // Pops back to the innermost open element named `name`. End tags with no
    // open counterpart are dropped.
    fn close(&mut self, name: &str) {
        let found = self.open[1..]
            .iter()
            .rposition(|node| self.dom.tag_name(*node) == Some(name));
        if let Some(index) = found {
            self.open.truncate(index + 1);
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn take_while(&mut self, accept: impl Fn(u8) -> bool) -> &str {
        let start = self.pos;
        while self.peek().is_some_and(&accept) {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    fn start_tag(&mut self) -> Result<StartTag> {
        self.pos += 1;
        let name = self.take_while(is_tag_char).to_ascii_lowercase();
        let src = self.src;
        let mut attrs = HashMap::new();
        loop {
            self.skip_ws();
            let rest = &src[self.pos..];
            if rest.is_empty() {
                return Err(Error::HtmlParse(format!("unclosed start tag <{name}>")));
            }
            if rest.starts_with('>') {
                self.pos += 1;
                return Ok(StartTag {
                    name,
                    attrs,
                    self_closing: false,
                });
            }
            if rest.starts_with("/>") {
                self.pos += 2;
                return Ok(StartTag {
                    name,
                    attrs,
                    self_closing: true,
                });
            }
            let attr_name = self.take_while(is_attr_name_char).to_ascii_lowercase();
            if attr_name.is_empty() {
                // Stray `/`, quote or other character between attributes.
                self.pos += rest.chars().next().map_or(1, char::len_utf8);
                continue;
            }
            self.skip_ws();
            let value = if self.peek() == Some(b'=') {
                self.pos += 1;
                self.skip_ws();
                self.attr_value()?
            } else {
                String::new()
            };
            attrs.entry(attr_name).or_insert(value);
        }
    }

    fn attr_value(&mut self) -> Result<String> {
        let src = self.src;
        let raw = match self.peek() {
            None => return Err(Error::HtmlParse("missing attribute value".into())),
            Some(quote @ (b'"' | b'\'')) => {
                self.pos += 1;
                let len = src[self.pos..]
                    .find(char::from(quote))
                    .ok_or_else(|| Error::HtmlParse("unclosed quoted attribute value".into()))?;
                let raw = &src[self.pos..self.pos + len];
                self.pos += len + 1;
                raw
            }
            Some(_) => {
                // Only ASCII bytes end the value, so the slice stays on
                // character boundaries.
                let start = self.pos;
                let bytes = src.as_bytes();
                while let Some(b) = self.peek() {
                    if b.is_ascii_whitespace() || b == b'>' || bytes[self.pos..].starts_with(b"/>") {
                        break;
                    }
                    self.pos += 1;
                }
                &src[start..self.pos]
            }
        };
        Ok(decode_html_character_references(raw))
    }

    fn end_tag(&mut self) -> Result<String> {
        self.pos += 2;
        self.skip_ws();
        let name = self.take_while(is_tag_char).to_ascii_lowercase();
        let len = self.src[self.pos..]
            .find('>')
            .ok_or_else(|| Error::HtmlParse(format!("unclosed end tag </{name}")))?;
        self.pos += len + 1;
        Ok(name)
    }

    // `<!DOCTYPE ...>` and friends. Quoted strings and a bracketed internal
    // subset may contain `>`.
    fn declaration(&mut self) -> Result<()> {
        let src = self.src;
        let mut quote = None;
        let mut depth = 0usize;
        for (offset, b) in src.as_bytes()[self.pos + 2..].iter().enumerate() {
            match (quote, *b) {
                (Some(q), b) if b == q => quote = None,
                (Some(_), _) => {}
                (None, b'"' | b'\'') => quote = Some(*b),
                (None, b'[') => depth += 1,
                (None, b']') => depth = depth.saturating_sub(1),
                (None, b'>') if depth == 0 => {
                    self.pos += 2 + offset + 1;
                    return Ok(());
                }
                _ => {}
            }
        }
        Err(Error::HtmlParse("unclosed declaration tag".into()))
    }
}

/// Byte offset of the first `</name` (ASCII case-insensitive, optional
/// whitespace after the slash) not followed by a name character.
fn find_raw_end_tag(src: &str, name: &str) -> Option<usize> {
    let bytes = src.as_bytes();
    let mut from = 0;
    while let Some(found) = src[from..].find("</") {
        let at = from + found;
        let name_start = at
            + 2
            + bytes[at + 2..]
                .iter()
                .take_while(|b| b.is_ascii_whitespace())
                .count();
        let name_end = name_start + name.len();
        let matches = bytes
            .get(name_start..name_end)
            .is_some_and(|candidate| candidate.eq_ignore_ascii_case(name.as_bytes()))
            && bytes.get(name_end).is_none_or(|b| !b.is_ascii_alphanumeric());
        if matches {
            return Some(at);
        }
        from = at + 2;
    }
    None
}

/// Decodes numeric references and a small table of named ones. Unknown or
/// malformed references are kept verbatim; the trailing `;` is optional.
pub(crate) fn decode_html_character_references(src: &str) -> String {
    let Some(first) = src.find('&') else {
        return src.to_string();
    };
    let mut out = String::with_capacity(src.len());
    out.push_str(&src[..first]);
    let mut rest = &src[first..];

    while let Some(after_amp) = rest.strip_prefix('&') {
        let token_len = after_amp
            .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '#'))
            .unwrap_or(after_amp.len());
        let token = &after_amp[..token_len];
        let decoded = match token.strip_prefix('#') {
            Some(numeric) => numeric_reference(numeric),
            None => named_reference(token),
        };
        rest = match decoded {
            Some(ch) => {
                out.push(ch);
                let tail = &after_amp[token_len..];
                tail.strip_prefix(';').unwrap_or(tail)
            }
            None => {
                out.push('&');
                after_amp
            }
        };
        let next = rest.find('&').unwrap_or(rest.len());
        out.push_str(&rest[..next]);
        rest = &rest[next..];
    }
    out
}

fn numeric_reference(digits: &str) -> Option<char> {
    let codepoint = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    char::from_u32(codepoint)
}

fn named_reference(name: &str) -> Option<char> {
    let ch = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{00A0}',
        "copy" => '©',
        "reg" => '®',
        "trade" => '™',
        "hellip" => '…',
        "mdash" => '—',
        "ndash" => '–',
        "laquo" => '«',
        "raquo" => '»',
        "ldquo" => '“',
        "rdquo" => '”',
        "lsquo" => '‘',
        "rsquo" => '’',
        "middot" => '·',
        "larr" => '←',
        "rarr" => '→',
        "uarr" => '↑',
        "darr" => '↓',
        "para" => '¶',
        "sect" => '§',
        _ => return None,
    };
    Some(ch)
}

fn is_tag_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

fn is_attr_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'.')
}

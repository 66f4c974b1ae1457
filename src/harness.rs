use super::*;

/// The document side of a [`Harness`]: tree, mocked layout and console.
///
/// This is the host a [`ScrollSpy`] reads from and writes to.
#[derive(Debug)]
pub struct Page {
    pub(crate) dom: Dom,
    pub(crate) layout: LayoutState,
    pub(crate) console: ConsoleState,
}

impl Page {
    pub(crate) fn from_html(html: &str) -> Result<Self> {
        Ok(Self {
            dom: parse_html(html)?,
            layout: LayoutState::default(),
            console: ConsoleState::default(),
        })
    }

    pub fn select_one(&self, selector: &str) -> Result<NodeId> {
        self.dom
            .query_selector(selector)?
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))
    }

    pub fn select_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        self.dom.query_selector_all(selector)
    }

    pub fn has_class(&self, node: NodeId, class_name: &str) -> Result<bool> {
        self.dom.class_contains(node, class_name)
    }

    pub fn text_content(&self, node: NodeId) -> String {
        self.dom.text_content(node)
    }
}

impl ViewportQuery for Page {
    type Node = NodeId;

    fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        self.dom.query_selector(selector)
    }

    fn query_selector_all(&self, scope: Option<&NodeId>, selector: &str) -> Result<Vec<NodeId>> {
        match scope {
            Some(root) => self.dom.query_selector_all_from(*root, selector),
            None => self.dom.query_selector_all(selector),
        }
    }

    fn attribute(&self, node: &NodeId, name: &str) -> Option<String> {
        self.dom.attr(*node, name)
    }

    fn offset_top(&self, node: &NodeId) -> Result<f64> {
        Ok(self.layout.offset_top(&self.dom, *node)? as f64)
    }

    fn scroll_y(&self) -> f64 {
        self.layout.scroll_y
    }
}

impl LabelSet<NodeId> for Page {
    fn set_class(&mut self, node: &NodeId, class_name: &str, on: bool) -> Result<()> {
        if on {
            self.dom.class_add(*node, class_name)
        } else {
            self.dom.class_remove(*node, class_name)
        }
    }
}

impl Console for Page {
    fn log(&mut self, line: &str) {
        self.console.messages.push(line.to_string());
    }
}

/// Deterministic, non-rendering page for driving a scroll spy.
///
/// ```
/// use toc_scrollspy::{Harness, ScrollSpyConfig};
///
/// let mut h = Harness::from_html(r##"
///     <nav class="toc"><a href="#a">A</a><a href="#b">B</a></nav>
///     <main class="docs-content"><h2 id="a">A</h2><h2 id="b">B</h2></main>
/// "##)?;
/// h.set_offset_top("#b", 800)?;
/// h.install_scroll_spy(ScrollSpyConfig::default())?;
/// h.load()?;
/// h.assert_active(".toc a[href='#a']")?;
/// h.scroll_to(750.0)?;
/// h.assert_active(".toc a[href='#b']")?;
/// # Ok::<(), toc_scrollspy::Error>(())
/// ```
#[derive(Debug)]
pub struct Harness {
    pub(crate) page: Page,
    pub(crate) listeners: ListenerStore<Page>,
    pub(crate) active_class: String,
    pub(crate) trace_state: TraceState,
}

impl Harness {
    pub fn from_html(html: &str) -> Result<Self> {
        Ok(Self {
            page: Page::from_html(html)?,
            listeners: ListenerStore::default(),
            active_class: DEFAULT_ACTIVE_CLASS.to_string(),
            trace_state: TraceState::default(),
        })
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut Page {
        &mut self.page
    }

    /// Registers a scroll spy to start on [`load`](Self::load).
    pub fn install_scroll_spy(&mut self, config: ScrollSpyConfig) -> Result<()> {
        config.validate()?;
        self.active_class = config.active_class.clone();
        bind(&mut self.listeners, config);
        Ok(())
    }

    /// Fires the ready signal. Only the first call dispatches.
    ///
    /// Every ready handler runs even when an earlier one fails; the first
    /// error is returned once all of them have run.
    pub fn load(&mut self) -> Result<()> {
        if self.listeners.ready_fired {
            self.trace_state
                .line("[event] DOMContentLoaded skipped: already fired".into());
            return Ok(());
        }
        self.listeners.ready_fired = true;
        let handlers = std::mem::take(&mut self.listeners.ready);
        self.trace_state.line(format!(
            "[event] DOMContentLoaded listeners={}",
            handlers.len()
        ));
        let mut first_error = None;
        for handler in handlers {
            let scroll_events: &mut dyn ScrollEvents<Page> = &mut self.listeners.scroll;
            if let Err(err) = handler(&mut self.page, scroll_events) {
                log::warn!("ready handler failed: {err}");
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Moves the viewport. A scroll event is dispatched when the position
    /// actually changes; negative positions clamp to the document top.
    pub fn scroll_to(&mut self, y: f64) -> Result<()> {
        let y = if y.is_finite() { y.max(0.0) } else { 0.0 };
        if y == self.page.layout.scroll_y {
            return Ok(());
        }
        self.page.layout.scroll_y = y;
        self.dispatch_scroll()
    }

    pub fn scroll_by(&mut self, dy: f64) -> Result<()> {
        self.scroll_to(self.page.layout.scroll_y + dy)
    }

    /// Dispatches a scroll event without moving the viewport.
    pub fn dispatch_scroll(&mut self) -> Result<()> {
        self.trace_state.line(format!(
            "[event] scroll y={} listeners={}",
            self.page.layout.scroll_y,
            self.listeners.scroll.handlers.len()
        ));
        for handler in self.listeners.scroll.handlers.iter_mut() {
            handler(&mut self.page)?;
        }
        Ok(())
    }

    pub fn scroll_y(&self) -> f64 {
        self.page.layout.scroll_y
    }

    /// Declares the document offset of every element matching `selector`.
    pub fn set_offset_top(&mut self, selector: &str, offset_top: i64) -> Result<()> {
        let targets = self.page.dom.query_selector_all(selector)?;
        if targets.is_empty() {
            return Err(Error::SelectorNotFound(selector.to_string()));
        }
        for target in targets {
            self.page.layout.offsets.insert(target, offset_top);
        }
        Ok(())
    }

    /// Sets an attribute on the first element matching `selector`. Captured
    /// headings and links pick the new value up on the next scroll.
    pub fn set_attribute(&mut self, selector: &str, name: &str, value: &str) -> Result<()> {
        let target = self.page.select_one(selector)?;
        self.page.dom.set_attr(target, name, value)
    }

    pub fn remove_attribute(&mut self, selector: &str, name: &str) -> Result<()> {
        let target = self.page.select_one(selector)?;
        self.page.dom.remove_attr(target, name)
    }

    /// Parses `html` and appends it to the first element matching `parent_selector`.
    pub fn append_html(&mut self, parent_selector: &str, html: &str) -> Result<()> {
        let parent = self.page.select_one(parent_selector)?;
        let fragment = parse_html(html)?;
        self.page.dom.adopt_children(parent, &fragment, fragment.root)
    }

    pub fn ready_listener_count(&self) -> usize {
        self.listeners.ready.len()
    }

    pub fn scroll_listener_count(&self) -> usize {
        self.listeners.scroll.handlers.len()
    }

    /// `href` values of every element carrying the active class, in document order.
    pub fn active_links(&self) -> Vec<String> {
        self.active_nodes()
            .into_iter()
            .map(|node| self.page.dom.attr(node, "href").unwrap_or_default())
            .collect()
    }

    fn active_nodes(&self) -> Vec<NodeId> {
        let dom = &self.page.dom;
        dom.elements_in(dom.root)
            .into_iter()
            .filter(|node| {
                dom.element(*node)
                    .is_some_and(|element| element.has_class(&self.active_class))
            })
            .collect()
    }

    /// Passes when the matched element is the only one marked active.
    pub fn assert_active(&self, selector: &str) -> Result<()> {
        let target = self.page.select_one(selector)?;
        let active = self.active_nodes();
        if active != [target] {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: format!("only {selector} active"),
                actual: format!("active hrefs {:?}", self.active_links()),
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_no_active(&self) -> Result<()> {
        let active = self.active_nodes();
        if let Some(first) = active.first() {
            return Err(Error::AssertionFailed {
                selector: format!(".{}", self.active_class),
                expected: "no active element".into(),
                actual: format!("active hrefs {:?}", self.active_links()),
                dom_snippet: self.node_snippet(*first),
            });
        }
        Ok(())
    }

    pub fn assert_class(&self, selector: &str, class_name: &str, expected: bool) -> Result<()> {
        let target = self.page.select_one(selector)?;
        let actual = self.page.dom.class_contains(target, class_name)?;
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: format!("class {class_name} present={expected}"),
                actual: format!("class {class_name} present={actual}"),
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_exists(&self, selector: &str) -> Result<()> {
        let _ = self.page.select_one(selector)?;
        Ok(())
    }

    pub fn dump_dom(&self, selector: &str) -> Result<String> {
        let target = self.page.select_one(selector)?;
        Ok(self.page.dom.dump_node(target))
    }

    /// Serializes the whole document.
    pub fn document_html(&self) -> String {
        self.page.dom.dump_node(self.page.dom.root)
    }

    pub(crate) fn node_snippet(&self, node_id: NodeId) -> String {
        truncate_chars(&self.page.dom.dump_node(node_id), 200)
    }

    pub fn take_console_messages(&mut self) -> Vec<String> {
        std::mem::take(&mut self.page.console.messages)
    }

    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace_state.enabled = enabled;
    }

    pub fn set_trace_stderr(&mut self, enabled: bool) {
        self.trace_state.to_stderr = enabled;
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::InvalidConfig(
                "set_trace_log_limit requires at least 1 entry".into(),
            ));
        }
        self.trace_state.log_limit = max_entries;
        while self.trace_state.logs.len() > self.trace_state.log_limit {
            self.trace_state.logs.pop_front();
        }
        Ok(())
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        self.trace_state.logs.drain(..).collect()
    }
}

use super::*;

/// Mocked layout geometry: nothing is rendered, so offsets are whatever the
/// embedder declares. Elements without a declared offset sit at the top.
#[derive(Debug, Default)]
pub(crate) struct LayoutState {
    pub(crate) offsets: HashMap<NodeId, i64>,
    pub(crate) scroll_y: f64,
}

impl LayoutState {
    pub(crate) fn offset_top(&self, dom: &Dom, node_id: NodeId) -> Result<i64> {
        if dom.element(node_id).is_none() {
            return Err(Error::NotAnElement("offsetTop target".into()));
        }
        Ok(self.offsets.get(&node_id).copied().unwrap_or(0))
    }
}

#[derive(Debug, Default)]
pub(crate) struct ConsoleState {
    pub(crate) messages: Vec<String>,
}

pub(crate) struct ListenerStore<H> {
    pub(crate) ready: Vec<ReadyHandler<H>>,
    pub(crate) scroll: ScrollListeners<H>,
    pub(crate) ready_fired: bool,
}

impl<H> Default for ListenerStore<H> {
    fn default() -> Self {
        Self {
            ready: Vec::new(),
            scroll: ScrollListeners::default(),
            ready_fired: false,
        }
    }
}

impl<H> fmt::Debug for ListenerStore<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerStore")
            .field("ready", &self.ready.len())
            .field("scroll", &self.scroll.handlers.len())
            .field("ready_fired", &self.ready_fired)
            .finish()
    }
}

impl<H> ScrollEvents<H> for ListenerStore<H> {
    fn on_scroll_changed(&mut self, handler: ScrollHandler<H>) {
        self.scroll.on_scroll_changed(handler);
    }
}

impl<H> PageEvents<H> for ListenerStore<H> {
    fn on_ready(&mut self, handler: ReadyHandler<H>) {
        // Like DOMContentLoaded, a listener added after the event fired never runs.
        if self.ready_fired {
            log::debug!("ready listener registered after load; it will not run");
            return;
        }
        self.ready.push(handler);
    }
}

pub(crate) struct ScrollListeners<H> {
    pub(crate) handlers: Vec<ScrollHandler<H>>,
}

impl<H> Default for ScrollListeners<H> {
    fn default() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }
}

impl<H> ScrollEvents<H> for ScrollListeners<H> {
    fn on_scroll_changed(&mut self, handler: ScrollHandler<H>) {
        self.handlers.push(handler);
    }
}

#[derive(Debug)]
pub(crate) struct TraceState {
    pub(crate) enabled: bool,
    pub(crate) logs: VecDeque<String>,
    pub(crate) log_limit: usize,
    pub(crate) to_stderr: bool,
}

impl Default for TraceState {
    fn default() -> Self {
        Self {
            enabled: false,
            logs: VecDeque::new(),
            log_limit: 10_000,
            to_stderr: true,
        }
    }
}

impl TraceState {
    pub(crate) fn line(&mut self, line: String) {
        log::trace!("{line}");
        if !self.enabled {
            return;
        }
        if self.to_stderr {
            eprintln!("{line}");
        }
        while self.logs.len() >= self.log_limit {
            self.logs.pop_front();
        }
        self.logs.push_back(line);
    }
}

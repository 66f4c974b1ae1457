//! Table-of-contents scroll spy.
//!
//! The spy captures the TOC links and the content headings once, when the
//! page signals it is ready, then keeps the link of the most recently
//! scrolled-past heading marked with the active class. The host document is
//! reached only through [`ViewportQuery`], [`LabelSet`] and [`Console`], and
//! events through [`PageEvents`], so the same code drives the in-memory
//! [`Harness`](crate::Harness) and, with the `web` feature, a live browser.

use super::*;

/// Distance below the viewport top at which a heading counts as reached.
pub const DEFAULT_LOOKAHEAD: f64 = 100.0;
pub const DEFAULT_TOC_SELECTOR: &str = ".toc";
pub const DEFAULT_LINK_SELECTOR: &str = "a[href^=\"#\"]";
pub const DEFAULT_HEADING_SELECTOR: &str = ".docs-content h2[id], .docs-content h3[id]";
pub const DEFAULT_ACTIVE_CLASS: &str = "active";

#[derive(Debug, Clone, PartialEq)]
pub struct ScrollSpyConfig {
    /// Locates the TOC container; the first match in document order is used.
    pub toc_selector: String,
    /// Collects the TOC links, scoped to the container.
    pub link_selector: String,
    /// Collects the headings from the whole document.
    pub heading_selector: String,
    pub active_class: String,
    pub lookahead: f64,
}

impl Default for ScrollSpyConfig {
    fn default() -> Self {
        Self {
            toc_selector: DEFAULT_TOC_SELECTOR.to_string(),
            link_selector: DEFAULT_LINK_SELECTOR.to_string(),
            heading_selector: DEFAULT_HEADING_SELECTOR.to_string(),
            active_class: DEFAULT_ACTIVE_CLASS.to_string(),
            lookahead: DEFAULT_LOOKAHEAD,
        }
    }
}

impl ScrollSpyConfig {
    pub fn with_toc_selector(mut self, selector: impl Into<String>) -> Self {
        self.toc_selector = selector.into();
        self
    }

    pub fn with_link_selector(mut self, selector: impl Into<String>) -> Self {
        self.link_selector = selector.into();
        self
    }

    pub fn with_heading_selector(mut self, selector: impl Into<String>) -> Self {
        self.heading_selector = selector.into();
        self
    }

    pub fn with_active_class(mut self, class_name: impl Into<String>) -> Self {
        self.active_class = class_name.into();
        self
    }

    /// Sets the lookahead bias. Sites with a fixed header usually want the
    /// header height here.
    pub fn with_lookahead(mut self, lookahead: f64) -> Self {
        self.lookahead = lookahead;
        self
    }

    /// Checks the selectors against the harness selector grammar and the
    /// class name and lookahead for usable values.
    pub fn validate(&self) -> Result<()> {
        for selector in [
            &self.toc_selector,
            &self.link_selector,
            &self.heading_selector,
        ] {
            parse_selector_list(selector)?;
        }
        if self.active_class.is_empty() || self.active_class.contains(char::is_whitespace) {
            return Err(Error::InvalidConfig(format!(
                "active class must be a single non-empty token: {:?}",
                self.active_class
            )));
        }
        if !self.lookahead.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "lookahead must be finite: {}",
                self.lookahead
            )));
        }
        Ok(())
    }
}

/// Read access to the host document and its layout.
pub trait ViewportQuery {
    type Node: Clone;

    fn query_selector(&self, selector: &str) -> Result<Option<Self::Node>>;

    /// All matches in document order, below `scope` when given.
    fn query_selector_all(
        &self,
        scope: Option<&Self::Node>,
        selector: &str,
    ) -> Result<Vec<Self::Node>>;

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

    /// Distance from the document top to the element's top edge.
    fn offset_top(&self, node: &Self::Node) -> Result<f64>;

    fn scroll_y(&self) -> f64;
}

/// Write access to the display marker of TOC links.
pub trait LabelSet<N> {
    fn set_class(&mut self, node: &N, class_name: &str, on: bool) -> Result<()>;
}

/// Diagnostic output channel.
pub trait Console {
    fn log(&mut self, line: &str);
}

pub type ScrollHandler<H> = Box<dyn FnMut(&mut H) -> Result<()>>;
pub type ReadyHandler<H> = Box<dyn FnOnce(&mut H, &mut dyn ScrollEvents<H>) -> Result<()>>;

pub trait ScrollEvents<H> {
    fn on_scroll_changed(&mut self, handler: ScrollHandler<H>);
}

pub trait PageEvents<H>: ScrollEvents<H> {
    /// The handler runs once, when the document structure is available. It
    /// may subscribe to scroll changes through the source it is handed.
    fn on_ready(&mut self, handler: ReadyHandler<H>);
}

/// Why initialization left the page untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MissingElement {
    #[error("no TOC container")]
    TocContainer,
    #[error("TOC container has no fragment links")]
    TocLinks,
    #[error("document has no headings to spy on")]
    Headings,
}

#[derive(Debug)]
pub enum Init<N> {
    Active(ScrollSpy<N>),
    Inactive(MissingElement),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingPosition<'a> {
    pub id: &'a str,
    pub offset_top: f64,
}

/// Returns the id of the last heading, in document order, whose offset is
/// at or above `scroll_y + lookahead`.
///
/// Every heading is visited: offsets are not assumed to be sorted, and a
/// later qualifying heading always replaces an earlier one.
pub fn active_heading<'a, I>(headings: I, scroll_y: f64, lookahead: f64) -> Option<&'a str>
where
    I: IntoIterator<Item = HeadingPosition<'a>>,
{
    let scroll_pos = scroll_y + lookahead;
    let mut current = None;
    for heading in headings {
        if heading.offset_top <= scroll_pos {
            current = Some(heading.id);
        }
    }
    current
}

/// An empty heading id never activates anything, even a link to `#`.
pub fn is_link_active(fragment: Option<&str>, current: Option<&str>) -> bool {
    match (fragment, current) {
        (Some(fragment), Some(current)) if !current.is_empty() => fragment == current,
        _ => false,
    }
}

#[derive(Debug, Clone)]
pub struct ScrollSpy<N> {
    links: Vec<N>,
    headings: Vec<N>,
    active_class: String,
    lookahead: f64,
    active: Option<String>,
}

impl<N: Clone> ScrollSpy<N> {
    /// Captures the TOC links and headings. Missing pieces are reported on
    /// the console and yield [`Init::Inactive`]; only host failures are errors.
    pub fn init<H>(host: &mut H, config: &ScrollSpyConfig) -> Result<Init<N>>
    where
        H: ViewportQuery<Node = N> + Console,
    {
        let Some(toc) = host.query_selector(&config.toc_selector)? else {
            diagnostic(host, "No TOC found");
            return Ok(Init::Inactive(MissingElement::TocContainer));
        };

        let links = host.query_selector_all(Some(&toc), &config.link_selector)?;
        let headings = host.query_selector_all(None, &config.heading_selector)?;

        diagnostic(host, &format!("TOC links: {}", links.len()));
        diagnostic(host, &format!("Headings: {}", headings.len()));

        if links.is_empty() {
            return Ok(Init::Inactive(MissingElement::TocLinks));
        }
        if headings.is_empty() {
            return Ok(Init::Inactive(MissingElement::Headings));
        }

        Ok(Init::Active(Self {
            links,
            headings,
            active_class: config.active_class.clone(),
            lookahead: config.lookahead,
            active: None,
        }))
    }

    /// Recomputes the active heading and re-marks the links. Returns the id
    /// of the heading whose links are now active, if any.
    pub fn refresh<H>(&mut self, host: &mut H) -> Result<Option<String>>
    where
        H: ViewportQuery<Node = N> + LabelSet<N>,
    {
        let scroll_y = host.scroll_y();
        let mut positions = Vec::with_capacity(self.headings.len());
        for heading in &self.headings {
            let id = host.attribute(heading, "id").unwrap_or_default();
            positions.push((id, host.offset_top(heading)?));
        }
        let current = active_heading(
            positions.iter().map(|(id, offset_top)| HeadingPosition {
                id: id.as_str(),
                offset_top: *offset_top,
            }),
            scroll_y,
            self.lookahead,
        );

        for link in &self.links {
            host.set_class(link, &self.active_class, false)?;
            let fragment = host
                .attribute(link, "href")
                .and_then(|href| fragment_of(&href));
            if is_link_active(fragment.as_deref(), current) {
                host.set_class(link, &self.active_class, true)?;
            }
        }

        let active = current.filter(|id| !id.is_empty()).map(str::to_string);
        if active != self.active {
            log::debug!(
                "active TOC entry: {} -> {}",
                self.active.as_deref().unwrap_or("-"),
                active.as_deref().unwrap_or("-")
            );
            self.active = active.clone();
        }
        Ok(active)
    }

    pub fn links(&self) -> &[N] {
        &self.links
    }

    pub fn headings(&self) -> &[N] {
        &self.headings
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }
}

fn diagnostic<H: Console + ?Sized>(host: &mut H, line: &str) {
    log::info!("{line}");
    host.log(line);
}

/// Installs the spy on `events`: initialization waits for the ready signal,
/// and only a successful initialization subscribes to scroll changes.
pub fn bind<H, E>(events: &mut E, config: ScrollSpyConfig)
where
    H: ViewportQuery + LabelSet<<H as ViewportQuery>::Node> + Console + 'static,
    H::Node: 'static,
    E: PageEvents<H> + ?Sized,
{
    events.on_ready(Box::new(move |host: &mut H, scroll_events: &mut dyn ScrollEvents<H>| {
        let Init::Active(mut spy) = ScrollSpy::<H::Node>::init(host, &config)? else {
            return Ok(());
        };
        let mut handler: ScrollHandler<H> = Box::new(move |host: &mut H| {
            spy.refresh(host)?;
            Ok(())
        });
        // Reflect the load-time position before any scroll event arrives.
        handler(host)?;
        scroll_events.on_scroll_changed(handler);
        Ok(())
    }));
}

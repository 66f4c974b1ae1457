use super::*;
use std::collections::HashSet;

const DOCS_HTML: &str = r##"
<nav class="toc">
  <a href="#a">A</a>
  <a href="#b">B</a>
  <a href="#c">C</a>
</nav>
<main class="docs-content">
  <h2 id="a">A</h2>
  <h2 id="b">B</h2>
  <h3 id="c">C</h3>
</main>
"##;

fn docs_harness(offsets: &[(&str, i64)]) -> Result<Harness> {
    let mut h = Harness::from_html(DOCS_HTML)?;
    for (selector, offset) in offsets {
        h.set_offset_top(selector, *offset)?;
    }
    h.install_scroll_spy(ScrollSpyConfig::default())?;
    Ok(h)
}

fn positions<'a>(headings: &'a [(&'a str, f64)]) -> impl Iterator<Item = HeadingPosition<'a>> {
    headings
        .iter()
        .map(|(id, offset_top)| HeadingPosition {
            id: *id,
            offset_top: *offset_top,
        })
}

#[test]
fn active_heading_picks_last_qualifying_heading() {
    let headings = [("a", 0.0), ("b", 500.0), ("c", 1000.0)];
    assert_eq!(active_heading(positions(&headings), 0.0, 100.0), Some("a"));
    assert_eq!(active_heading(positions(&headings), 399.0, 100.0), Some("a"));
    assert_eq!(active_heading(positions(&headings), 400.0, 100.0), Some("b"));
    assert_eq!(active_heading(positions(&headings), 950.0, 100.0), Some("c"));
    assert_eq!(active_heading(positions(&headings), 5000.0, 100.0), Some("c"));
}

#[test]
fn active_heading_is_none_above_first_heading() {
    let headings = [("a", 200.0), ("b", 900.0)];
    assert_eq!(active_heading(positions(&headings), 0.0, 100.0), None);
    assert_eq!(active_heading(positions(&[]), 1000.0, 100.0), None);
}

#[test]
fn active_heading_follows_document_order_not_offset_order() {
    // "b" sits above "a" on screen but comes later in the document.
    let headings = [("a", 800.0), ("b", 100.0)];
    assert_eq!(active_heading(positions(&headings), 0.0, 100.0), Some("b"));
    assert_eq!(active_heading(positions(&headings), 750.0, 100.0), Some("b"));
}

#[test]
fn active_heading_honours_lookahead() {
    let headings = [("a", 0.0), ("b", 500.0)];
    assert_eq!(active_heading(positions(&headings), 450.0, 0.0), Some("a"));
    assert_eq!(active_heading(positions(&headings), 500.0, 0.0), Some("b"));
    assert_eq!(active_heading(positions(&headings), 300.0, 250.0), Some("b"));
}

#[test]
fn empty_current_id_never_activates_a_link() {
    assert!(is_link_active(Some("a"), Some("a")));
    assert!(!is_link_active(Some("a"), Some("b")));
    assert!(!is_link_active(Some(""), Some("")));
    assert!(!is_link_active(None, Some("")));
    assert!(!is_link_active(Some("a"), None));
    assert!(!is_link_active(None, None));
}

#[test]
fn fragment_of_extracts_and_decodes() {
    assert_eq!(fragment_of("#intro").as_deref(), Some("intro"));
    assert_eq!(fragment_of("#caf%C3%A9").as_deref(), Some("café"));
    assert_eq!(fragment_of("#café").as_deref(), Some("café"));
    assert_eq!(fragment_of("#a%20b").as_deref(), Some("a b"));
    assert_eq!(fragment_of("/guide.html#setup").as_deref(), Some("setup"));
    assert_eq!(fragment_of("#%FF").as_deref(), Some("%FF"));
    assert_eq!(fragment_of("#"), None);
    assert_eq!(fragment_of("/guide.html"), None);
}

#[test]
fn default_config_validates() -> Result<()> {
    let config = ScrollSpyConfig::default();
    config.validate()?;
    assert_eq!(config.toc_selector, ".toc");
    assert_eq!(config.link_selector, "a[href^=\"#\"]");
    assert_eq!(config.active_class, "active");
    assert_eq!(config.lookahead, 100.0);
    Ok(())
}

#[test]
fn invalid_config_is_rejected() {
    let bad_selector = ScrollSpyConfig::default().with_heading_selector("h2[id");
    assert!(matches!(
        bad_selector.validate(),
        Err(Error::UnsupportedSelector(_))
    ));

    for class_name in ["", "is active", " active"] {
        let config = ScrollSpyConfig::default().with_active_class(class_name);
        assert!(
            matches!(config.validate(), Err(Error::InvalidConfig(_))),
            "class {class_name:?} should be rejected"
        );
    }

    for lookahead in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        let config = ScrollSpyConfig::default().with_lookahead(lookahead);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }
}

#[test]
fn invalid_config_installs_nothing() -> Result<()> {
    let mut h = Harness::from_html(DOCS_HTML)?;
    let err = h
        .install_scroll_spy(ScrollSpyConfig::default().with_toc_selector(".toc >"))
        .expect_err("dangling combinator should fail");
    assert!(matches!(err, Error::UnsupportedSelector(_)));
    assert_eq!(h.ready_listener_count(), 0);
    Ok(())
}

#[test]
fn missing_toc_installs_no_scroll_handler_and_mutates_nothing() -> Result<()> {
    let html = r##"
        <main class="docs-content"><h2 id="a">A</h2></main>
        <aside><a href="#a">A</a></aside>
    "##;
    let mut h = Harness::from_html(html)?;
    h.install_scroll_spy(ScrollSpyConfig::default())?;
    let before = h.document_html();

    h.load()?;
    h.scroll_to(300.0)?;

    assert_eq!(h.scroll_listener_count(), 0);
    assert_eq!(h.document_html(), before);
    assert_eq!(h.take_console_messages(), vec!["No TOC found"]);
    Ok(())
}

#[test]
fn toc_without_fragment_links_installs_no_scroll_handler() -> Result<()> {
    let html = r##"
        <nav class="toc"><a href="/elsewhere">Out</a></nav>
        <main class="docs-content"><h2 id="a">A</h2></main>
    "##;
    let mut h = Harness::from_html(html)?;
    h.install_scroll_spy(ScrollSpyConfig::default())?;
    h.load()?;

    assert_eq!(h.scroll_listener_count(), 0);
    assert_eq!(
        h.take_console_messages(),
        vec!["TOC links: 0", "Headings: 1"]
    );
    h.assert_no_active()?;
    Ok(())
}

#[test]
fn document_without_headings_installs_no_scroll_handler() -> Result<()> {
    let html = r##"
        <nav class="toc"><a href="#a">A</a></nav>
        <main class="docs-content"><h2>A</h2><h4 id="d">D</h4></main>
        <h2 id="outside">Outside</h2>
    "##;
    let mut h = Harness::from_html(html)?;
    h.install_scroll_spy(ScrollSpyConfig::default())?;
    h.load()?;

    assert_eq!(h.scroll_listener_count(), 0);
    assert_eq!(
        h.take_console_messages(),
        vec!["TOC links: 1", "Headings: 0"]
    );
    h.assert_no_active()?;
    Ok(())
}

#[test]
fn init_reports_which_element_is_missing() -> Result<()> {
    let config = ScrollSpyConfig::default();
    let cases = [
        ("<main></main>", MissingElement::TocContainer),
        (
            r##"<nav class="toc"></nav><main class="docs-content"><h2 id="a"></h2></main>"##,
            MissingElement::TocLinks,
        ),
        (
            r##"<nav class="toc"><a href="#a"></a></nav>"##,
            MissingElement::Headings,
        ),
    ];
    for (html, expected) in cases {
        let mut h = Harness::from_html(html)?;
        match ScrollSpy::init(h.page_mut(), &config)? {
            Init::Inactive(missing) => assert_eq!(missing, expected, "html {html}"),
            Init::Active(_) => panic!("{html} should not activate"),
        }
    }
    Ok(())
}

#[test]
fn init_captures_links_and_headings_in_document_order() -> Result<()> {
    let mut h = Harness::from_html(DOCS_HTML)?;
    let Init::Active(spy) = ScrollSpy::init(h.page_mut(), &ScrollSpyConfig::default())? else {
        panic!("spy should activate");
    };
    assert_eq!(spy.links().len(), 3);
    let heading_ids = spy
        .headings()
        .iter()
        .map(|node| h.page().dom.attr(*node, "id").unwrap_or_default())
        .collect::<Vec<_>>();
    assert_eq!(heading_ids, vec!["a", "b", "c"]);
    assert_eq!(spy.active_id(), None);
    Ok(())
}

#[test]
fn load_logs_counts_and_activates_first_heading() -> Result<()> {
    let mut h = docs_harness(&[("#b", 500), ("#c", 1000)])?;
    h.load()?;

    assert_eq!(
        h.take_console_messages(),
        vec!["TOC links: 3", "Headings: 3"]
    );
    assert_eq!(h.scroll_listener_count(), 1);
    h.assert_active(".toc a[href='#a']")?;
    Ok(())
}

#[test]
fn scrolling_moves_the_active_link() -> Result<()> {
    let mut h = docs_harness(&[("#b", 500), ("#c", 1000)])?;
    h.load()?;

    h.scroll_to(450.0)?;
    h.assert_active(".toc a[href='#b']")?;
    assert_eq!(h.active_links(), vec!["#b"]);

    h.scroll_to(950.0)?;
    h.assert_active(".toc a[href='#c']")?;

    h.scroll_to(2000.0)?;
    h.assert_active(".toc a[href='#c']")?;

    h.scroll_to(0.0)?;
    h.assert_active(".toc a[href='#a']")?;
    Ok(())
}

#[test]
fn nothing_is_active_above_the_first_heading() -> Result<()> {
    let mut h = docs_harness(&[("#a", 200), ("#b", 500), ("#c", 1000)])?;
    h.load()?;
    h.assert_no_active()?;

    h.scroll_to(100.0)?;
    h.assert_active(".toc a[href='#a']")?;

    h.scroll_to(99.0)?;
    h.assert_no_active()?;
    Ok(())
}

#[test]
fn recomputing_at_the_same_position_is_idempotent() -> Result<()> {
    let mut h = docs_harness(&[("#b", 500), ("#c", 1000)])?;
    h.load()?;
    h.scroll_to(600.0)?;
    let once = h.document_html();

    h.dispatch_scroll()?;
    h.dispatch_scroll()?;
    assert_eq!(h.document_html(), once);
    h.assert_active(".toc a[href='#b']")?;
    Ok(())
}

#[test]
fn load_reflects_scroll_position_restored_before_ready() -> Result<()> {
    let mut h = docs_harness(&[("#b", 500), ("#c", 1000)])?;
    h.scroll_to(980.0)?;
    h.assert_no_active()?;

    h.load()?;
    h.assert_active(".toc a[href='#c']")?;
    Ok(())
}

#[test]
fn links_sharing_a_fragment_are_all_marked() -> Result<()> {
    let html = r##"
        <nav class="toc">
          <a id="first" href="#a">A</a>
          <a id="second" href="#a">A again</a>
          <a id="other" href="#b">B</a>
        </nav>
        <main class="docs-content"><h2 id="a">A</h2><h2 id="b">B</h2></main>
    "##;
    let mut h = Harness::from_html(html)?;
    h.set_offset_top("#b", 500)?;
    h.install_scroll_spy(ScrollSpyConfig::default())?;
    h.load()?;

    assert_eq!(h.active_links(), vec!["#a", "#a"]);
    h.assert_class("#first", "active", true)?;
    h.assert_class("#second", "active", true)?;
    h.assert_class("#other", "active", false)?;
    Ok(())
}

#[test]
fn unmatched_headings_and_links_are_tolerated() -> Result<()> {
    let html = r##"
        <nav class="toc"><a href="#a">A</a><a href="#ghost">Ghost</a></nav>
        <main class="docs-content"><h2 id="a">A</h2><h2 id="untracked">U</h2></main>
    "##;
    let mut h = Harness::from_html(html)?;
    h.set_offset_top("#untracked", 400)?;
    h.install_scroll_spy(ScrollSpyConfig::default())?;
    h.load()?;
    h.assert_active(".toc a[href='#a']")?;

    h.scroll_to(350.0)?;
    h.assert_no_active()?;
    Ok(())
}

#[test]
fn percent_encoded_fragment_matches_raw_heading_id() -> Result<()> {
    let html = r##"
        <nav class="toc"><a href="#intro">Intro</a><a href="#caf%C3%A9">Café</a></nav>
        <main class="docs-content"><h2 id="intro">Intro</h2><h2 id="café">Café</h2></main>
    "##;
    let mut h = Harness::from_html(html)?;
    h.set_offset_top("#café", 700)?;
    h.install_scroll_spy(ScrollSpyConfig::default())?;
    h.load()?;

    h.scroll_to(650.0)?;
    assert_eq!(h.active_links(), vec!["#caf%C3%A9"]);
    Ok(())
}

#[test]
fn unquoted_non_ascii_anchors_activate() -> Result<()> {
    let html = "<nav class=toc><a href=#intro>Intro</a><a href=#café>Café</a></nav>\
        <main class=docs-content><h2 id=intro>Intro</h2><h2 id=café>Café</h2></main>";
    let mut h = Harness::from_html(html)?;
    h.set_offset_top("#café", 700)?;
    h.install_scroll_spy(ScrollSpyConfig::default())?;
    h.load()?;

    h.scroll_to(650.0)?;
    assert_eq!(h.active_links(), vec!["#café"]);
    Ok(())
}

#[test]
fn qualifying_heading_with_empty_id_clears_the_active_link() -> Result<()> {
    let html = r##"
        <nav class="toc"><a href="#a">A</a><a href="#">Top</a></nav>
        <main class="docs-content"><h2 id="a">A</h2><h2 id="">Blank</h2></main>
    "##;
    let mut h = Harness::from_html(html)?;
    h.set_offset_top("h2:last-child", 500)?;
    h.install_scroll_spy(ScrollSpyConfig::default())?;
    h.load()?;
    h.assert_active(".toc a[href='#a']")?;

    h.scroll_to(450.0)?;
    h.assert_no_active()?;
    Ok(())
}

#[test]
fn zero_lookahead_activates_only_headings_at_the_viewport_top() -> Result<()> {
    let mut h = Harness::from_html(DOCS_HTML)?;
    h.set_offset_top("#b", 500)?;
    h.set_offset_top("#c", 1000)?;
    h.install_scroll_spy(ScrollSpyConfig::default().with_lookahead(0.0))?;
    h.load()?;

    h.scroll_to(450.0)?;
    h.assert_active(".toc a[href='#a']")?;
    h.scroll_to(500.0)?;
    h.assert_active(".toc a[href='#b']")?;
    Ok(())
}

#[test]
fn custom_selectors_and_active_class_are_used() -> Result<()> {
    let html = r##"
        <aside id="contents">
          <a class="entry" href="#one">One</a>
          <a href="#two">Two (not an entry)</a>
        </aside>
        <article>
          <h1 id="one">One</h1>
          <h1 id="two">Two</h1>
        </article>
    "##;
    let config = ScrollSpyConfig::default()
        .with_toc_selector("#contents")
        .with_link_selector("a.entry")
        .with_heading_selector("article > h1[id]")
        .with_active_class("is-current");
    let mut h = Harness::from_html(html)?;
    h.set_offset_top("#two", 300)?;
    h.install_scroll_spy(config)?;
    h.load()?;

    assert_eq!(
        h.take_console_messages(),
        vec!["TOC links: 1", "Headings: 2"]
    );
    h.assert_active("a.entry")?;
    h.assert_class("a.entry", "active", false)?;

    h.scroll_to(250.0)?;
    h.assert_no_active()?;
    h.assert_class("a[href='#two']", "is-current", false)?;
    Ok(())
}

#[test]
fn existing_classes_on_links_are_preserved() -> Result<()> {
    let html = r##"
        <nav class="toc"><a class="toc-link active" href="#a">A</a><a class="toc-link active" href="#b">B</a></nav>
        <main class="docs-content"><h2 id="a">A</h2><h2 id="b">B</h2></main>
    "##;
    let mut h = Harness::from_html(html)?;
    h.set_offset_top("#b", 500)?;
    h.install_scroll_spy(ScrollSpyConfig::default())?;
    h.load()?;

    h.assert_active(".toc a[href='#a']")?;
    h.assert_class(".toc a[href='#b']", "toc-link", true)?;
    Ok(())
}

#[test]
fn content_added_after_load_is_ignored() -> Result<()> {
    let mut h = docs_harness(&[("#b", 500), ("#c", 1000)])?;
    h.load()?;

    h.append_html(".docs-content", r##"<h2 id="d">D</h2>"##)?;
    h.append_html(".toc", r##"<a href="#d">D</a>"##)?;
    h.set_offset_top("#d", 1500)?;

    h.scroll_to(1600.0)?;
    h.assert_active(".toc a[href='#c']")?;
    h.assert_class(".toc a[href='#d']", "active", false)?;
    Ok(())
}

#[test]
fn captured_elements_are_read_live() -> Result<()> {
    let mut h = docs_harness(&[("#b", 500), ("#c", 1000)])?;
    h.load()?;
    h.scroll_to(600.0)?;
    h.assert_active(".toc a[href='#b']")?;

    // The heading keeps its place in the captured list under its new id.
    h.set_attribute("#b", "id", "c")?;
    h.dispatch_scroll()?;
    h.assert_active(".toc a[href='#c']")?;

    h.set_offset_top("h2[id='c']", 750)?;
    h.dispatch_scroll()?;
    h.assert_active(".toc a[href='#a']")?;

    h.remove_attribute(".toc a[href='#a']", "href")?;
    h.dispatch_scroll()?;
    h.assert_no_active()?;
    Ok(())
}

#[test]
fn ready_fires_only_once() -> Result<()> {
    let mut h = docs_harness(&[("#b", 500), ("#c", 1000)])?;
    h.load()?;
    h.load()?;

    assert_eq!(h.scroll_listener_count(), 1);
    assert_eq!(
        h.take_console_messages(),
        vec!["TOC links: 3", "Headings: 3"]
    );

    h.install_scroll_spy(ScrollSpyConfig::default())?;
    assert_eq!(h.ready_listener_count(), 0);
    Ok(())
}

#[derive(Default)]
struct ListHost {
    has_toc: bool,
    links: Vec<&'static str>,
    headings: Vec<(&'static str, f64)>,
    scroll_y: f64,
    active: HashSet<usize>,
    lines: Vec<String>,
}

const LINK_BASE: usize = 100;
const HEADING_BASE: usize = 200;

impl ViewportQuery for ListHost {
    type Node = usize;

    fn query_selector(&self, _selector: &str) -> Result<Option<usize>> {
        Ok(self.has_toc.then_some(0))
    }

    fn query_selector_all(&self, scope: Option<&usize>, _selector: &str) -> Result<Vec<usize>> {
        Ok(match scope {
            Some(_) => (0..self.links.len()).map(|i| LINK_BASE + i).collect(),
            None => (0..self.headings.len()).map(|i| HEADING_BASE + i).collect(),
        })
    }

    fn attribute(&self, node: &usize, name: &str) -> Option<String> {
        match (name, *node) {
            ("href", n) if n >= LINK_BASE && n < HEADING_BASE => {
                self.links.get(n - LINK_BASE).map(|href| href.to_string())
            }
            ("id", n) if n >= HEADING_BASE => {
                self.headings.get(n - HEADING_BASE).map(|(id, _)| id.to_string())
            }
            _ => None,
        }
    }

    fn offset_top(&self, node: &usize) -> Result<f64> {
        self.headings
            .get(node.wrapping_sub(HEADING_BASE))
            .map(|(_, offset)| *offset)
            .ok_or_else(|| Error::NotAnElement(format!("node {node}")))
    }

    fn scroll_y(&self) -> f64 {
        self.scroll_y
    }
}

impl LabelSet<usize> for ListHost {
    fn set_class(&mut self, node: &usize, _class_name: &str, on: bool) -> Result<()> {
        if on {
            self.active.insert(*node);
        } else {
            self.active.remove(node);
        }
        Ok(())
    }
}

impl Console for ListHost {
    fn log(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }
}

#[test]
fn scroll_spy_runs_against_any_host() -> Result<()> {
    let mut host = ListHost {
        has_toc: true,
        links: vec!["#intro", "#usage", "#faq"],
        headings: vec![("intro", 0.0), ("usage", 400.0), ("faq", 900.0)],
        ..ListHost::default()
    };
    let Init::Active(mut spy) = ScrollSpy::init(&mut host, &ScrollSpyConfig::default())? else {
        panic!("spy should activate");
    };
    assert_eq!(host.lines, vec!["TOC links: 3", "Headings: 3"]);

    assert_eq!(spy.refresh(&mut host)?.as_deref(), Some("intro"));
    assert_eq!(host.active, HashSet::from([LINK_BASE]));

    host.scroll_y = 850.0;
    assert_eq!(spy.refresh(&mut host)?.as_deref(), Some("faq"));
    assert_eq!(spy.active_id(), Some("faq"));
    assert_eq!(host.active, HashSet::from([LINK_BASE + 2]));
    Ok(())
}

#[test]
fn host_failures_propagate_from_refresh() -> Result<()> {
    let mut host = ListHost {
        has_toc: true,
        links: vec!["#intro"],
        headings: vec![("intro", 0.0)],
        ..ListHost::default()
    };
    let Init::Active(mut spy) = ScrollSpy::init(&mut host, &ScrollSpyConfig::default())? else {
        panic!("spy should activate");
    };
    host.headings.clear();
    assert!(matches!(spy.refresh(&mut host), Err(Error::NotAnElement(_))));
    Ok(())
}

#[test]
fn host_without_toc_stays_inactive() -> Result<()> {
    let mut host = ListHost::default();
    let init = ScrollSpy::init(&mut host, &ScrollSpyConfig::default())?;
    assert!(matches!(init, Init::Inactive(MissingElement::TocContainer)));
    assert_eq!(host.lines, vec!["No TOC found"]);
    Ok(())
}

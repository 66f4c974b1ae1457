//! Browser binding through `wasm-bindgen`.
//!
//! ```javascript
//! import init, { startScrollSpy } from './toc_scrollspy.js';
//!
//! await init();
//! startScrollSpy();
//! ```
//!
//! Starting after the document has been parsed is fine: the spy then
//! initializes immediately instead of waiting for `DOMContentLoaded`.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, DocumentReadyState, Element, Window};

use super::*;

fn host_error(err: JsValue) -> Error {
    Error::Host(err.as_string().unwrap_or_else(|| format!("{err:?}")))
}

/// The live document of the current browsing context.
#[derive(Debug, Clone)]
pub struct WebPage {
    window: Window,
    document: Document,
}

impl WebPage {
    pub fn new() -> Result<Self> {
        let window = web_sys::window().ok_or_else(|| Error::Host("no global window".into()))?;
        let document = window
            .document()
            .ok_or_else(|| Error::Host("window has no document".into()))?;
        Ok(Self { window, document })
    }
}

impl ViewportQuery for WebPage {
    type Node = Element;

    fn query_selector(&self, selector: &str) -> Result<Option<Element>> {
        self.document.query_selector(selector).map_err(host_error)
    }

    fn query_selector_all(&self, scope: Option<&Element>, selector: &str) -> Result<Vec<Element>> {
        let list = match scope {
            Some(root) => root.query_selector_all(selector),
            None => self.document.query_selector_all(selector),
        }
        .map_err(host_error)?;
        Ok((0..list.length())
            .filter_map(|index| list.get(index))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect())
    }

    fn attribute(&self, node: &Element, name: &str) -> Option<String> {
        node.get_attribute(name)
    }

    fn offset_top(&self, node: &Element) -> Result<f64> {
        Ok(node.get_bounding_client_rect().top() + self.scroll_y())
    }

    fn scroll_y(&self) -> f64 {
        self.window.scroll_y().unwrap_or(0.0)
    }
}

impl LabelSet<Element> for WebPage {
    fn set_class(&mut self, node: &Element, class_name: &str, on: bool) -> Result<()> {
        let classes = node.class_list();
        if on {
            classes.add_1(class_name)
        } else {
            classes.remove_1(class_name)
        }
        .map_err(host_error)
    }
}

impl Console for WebPage {
    fn log(&mut self, line: &str) {
        web_sys::console::log_1(&JsValue::from_str(line));
    }
}

/// `DOMContentLoaded` and `scroll` listeners on the window. Listener
/// closures live as long as the page.
pub struct WebEvents {
    window: Window,
    page: Rc<RefCell<WebPage>>,
}

impl WebEvents {
    pub fn new(page: WebPage) -> Self {
        Self {
            window: page.window.clone(),
            page: Rc::new(RefCell::new(page)),
        }
    }

    fn listen(&self, event: &str, callback: Closure<dyn FnMut()>) {
        if let Err(err) = self
            .window
            .add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
        {
            log::warn!("failed to add {event} listener: {}", host_error(err));
            return;
        }
        callback.forget();
    }
}

impl ScrollEvents<WebPage> for WebEvents {
    fn on_scroll_changed(&mut self, mut handler: ScrollHandler<WebPage>) {
        let page = Rc::clone(&self.page);
        let callback = Closure::<dyn FnMut()>::new(move || {
            // A scroll event dispatched while the page is borrowed is dropped.
            let Ok(mut page) = page.try_borrow_mut() else {
                return;
            };
            if let Err(err) = handler(&mut *page) {
                log::warn!("scroll spy refresh failed: {err}");
            }
        });
        self.listen("scroll", callback);
    }
}

impl PageEvents<WebPage> for WebEvents {
    /// Runs `handler` once the document is parsed. The wasm module usually
    /// finishes loading after `DOMContentLoaded`, so a document that is no
    /// longer `loading` runs the handler right away.
    fn on_ready(&mut self, handler: ReadyHandler<WebPage>) {
        let page = Rc::clone(&self.page);
        let mut scroll_events = WebEvents {
            window: self.window.clone(),
            page: Rc::clone(&self.page),
        };
        let run = move || {
            let Ok(mut host) = page.try_borrow_mut() else {
                log::warn!("page busy; scroll spy initialization skipped");
                return;
            };
            if let Err(err) = handler(&mut *host, &mut scroll_events) {
                log::warn!("scroll spy initialization failed: {err}");
            }
        };

        let loading = self.page.borrow().document.ready_state() == DocumentReadyState::Loading;
        if loading {
            self.listen("DOMContentLoaded", Closure::once(run));
        } else {
            run();
        }
    }
}

/// Installs the scroll spy on the current page.
pub fn start(config: ScrollSpyConfig) -> Result<()> {
    let mut events = WebEvents::new(WebPage::new()?);
    bind(&mut events, config);
    Ok(())
}

#[wasm_bindgen(js_name = startScrollSpy)]
pub fn start_scroll_spy() -> std::result::Result<(), JsValue> {
    start(ScrollSpyConfig::default()).map_err(|err| JsValue::from_str(&err.to_string()))
}

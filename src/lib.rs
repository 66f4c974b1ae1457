//! Scroll spy for documentation tables of contents.
//!
//! As the reader scrolls, the link in the table of contents that points at
//! the heading currently occupying the viewport is marked `active`.
//!
//! - [`ScrollSpy`] holds the captured links and headings and recomputes the
//!   active link; [`active_heading`] is the scan it runs, as a pure function.
//! - [`ViewportQuery`], [`LabelSet`], [`Console`] and [`PageEvents`] are the
//!   seams to the host document.
//! - [`Harness`] is a deterministic in-memory host: an HTML parser, a
//!   selector engine, mocked layout offsets and `ready`/`scroll` events.
//! - With the `web` feature, [`web`] binds the spy to a live browser page.

use std::collections::{HashMap, VecDeque};
use std::fmt;

mod core_dom_utils;
mod dom;
mod harness;
mod html;
mod runtime_state;
mod scroll_spy;
mod selector;
#[cfg(feature = "web")]
pub mod web;

pub(crate) use core_dom_utils::*;
pub(crate) use html::*;
pub(crate) use runtime_state::*;
pub(crate) use selector::*;

pub use core_dom_utils::{Error, NodeId, Result, fragment_of};
pub use harness::{Harness, Page};
pub use scroll_spy::{
    Console, DEFAULT_ACTIVE_CLASS, DEFAULT_HEADING_SELECTOR, DEFAULT_LINK_SELECTOR,
    DEFAULT_LOOKAHEAD, DEFAULT_TOC_SELECTOR, HeadingPosition, Init, LabelSet, MissingElement,
    PageEvents, ReadyHandler, ScrollEvents, ScrollHandler, ScrollSpy, ScrollSpyConfig,
    ViewportQuery, active_heading, bind, is_link_active,
};

#[cfg(test)]
mod tests;

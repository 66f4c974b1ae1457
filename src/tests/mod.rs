use super::*;

mod scroll_spy_core;

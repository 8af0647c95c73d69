//! Writing System Module
//!
//! Hands out writing system ids used to discriminate alternatives of
//! multilingual properties.

use std::collections::HashMap;

use tracing::debug;

use crate::cache::WsId;

/// Source of writing system ids keyed by locale identifier.
pub trait WritingSystemFactory {
    /// Returns the id for a locale, registering it if needed.
    fn ws_from_locale(&mut self, locale: &str) -> WsId;

    /// Returns the locale registered for an id.
    fn locale_from_ws(&self, ws: WsId) -> Option<&str>;
}

/// Assigns sequential ids, starting at 1, in order of first request.
#[derive(Debug, Default)]
pub struct InMemoryWritingSystemFactory {
    by_locale: HashMap<String, WsId>,
    locales: Vec<String>,
}

impl InMemoryWritingSystemFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.locales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locales.is_empty()
    }
}

impl WritingSystemFactory for InMemoryWritingSystemFactory {
    fn ws_from_locale(&mut self, locale: &str) -> WsId {
        if let Some(ws) = self.by_locale.get(locale) {
            return *ws;
        }
        self.locales.push(locale.to_string());
        let ws = self.locales.len() as WsId;
        self.by_locale.insert(locale.to_string(), ws);
        debug!(locale, ws, "registered writing system");
        ws
    }

    fn locale_from_ws(&self, ws: WsId) -> Option<&str> {
        let index = usize::try_from(ws).ok()?.checked_sub(1)?;
        self.locales.get(index).map(String::as_str)
    }
}

//! Browser bindings
//!
//! A JavaScript host owns the render loop: it calls `frame` from
//! `requestAnimationFrame`, forwards input by name and draws from JSON
//! snapshots.

use wasm_bindgen::prelude::*;

use crate::persistence::{KeyValueStore, LocalStore, MemoryStore};
use crate::session::{Intent, Session};

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        return;
    }
    log::info!("Star Snake (web) starting...");
}

#[wasm_bindgen]
pub struct WebSession {
    inner: Session,
}

#[wasm_bindgen]
impl WebSession {
    #[wasm_bindgen(constructor)]
    pub fn new(now: f64) -> WebSession {
        let store: Box<dyn KeyValueStore> = match LocalStore::open() {
            Ok(store) => Box::new(store),
            Err(e) => {
                log::warn!("{}; records will not persist", e);
                Box::new(MemoryStore::new())
            }
        };
        WebSession {
            inner: Session::new(store, now),
        }
    }

    /// Returns true if the simulation ticked
    pub fn frame(&mut self, now: f64) -> bool {
        self.inner.frame(now)
    }

    /// Returns false for unknown names and ignored input
    pub fn input(&mut self, name: &str, now: f64) -> bool {
        match Intent::from_name(name) {
            Some(intent) => self.inner.handle_intent(intent, now),
            None => false,
        }
    }

    pub fn select_level(&mut self, level: usize, now: f64) -> bool {
        self.inner.handle_intent(Intent::SelectLevel(level), now)
    }

    pub fn snapshot(&self, now: f64) -> String {
        serde_json::to_string(&self.inner.snapshot(now)).unwrap_or_default()
    }

    pub fn events(&mut self) -> String {
        serde_json::to_string(&self.inner.drain_events()).unwrap_or_default()
    }
}

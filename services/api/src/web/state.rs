//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use crate::web::session::SessionStore;
use pdf_chat_core::ports::{DocumentQaService, PdfStorage};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all
/// handlers. There is no ambient global: the storage variant, the session
/// store and the optional AI adapter are all threaded through here.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn PdfStorage>,
    pub sessions: SessionStore,
    /// `None` when no provider credential is configured; `/api/gemini`
    /// reports that as a per-request configuration error.
    pub qa_adapter: Option<Arc<dyn DocumentQaService>>,
    pub config: Arc<Config>,
}

//! crates/pdf_chat_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;

use crate::domain::{Chat, Message, NewChat, NewMessage, NewPdf, NewUser, Pdf, User};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Upstream provider error: {0}")]
    Upstream(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The storage engine contract. Implemented by the in-memory store and the
/// Postgres store; both expose the identical surface and the process picks
/// one at startup.
///
/// Point lookups return `Ok(None)` for an unresolvable id rather than an
/// error, so callers can distinguish "absent" from "storage failed".
#[async_trait]
pub trait PdfStorage: Send + Sync {
    // --- User operations ---
    async fn get_user(&self, id: i64) -> PortResult<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> PortResult<Option<User>>;
    /// Creates a user, enforcing email uniqueness atomically at insert time.
    /// Returns `PortError::Conflict` when the email is already registered.
    async fn create_user(&self, new_user: NewUser) -> PortResult<User>;

    // --- PDF operations ---
    async fn create_pdf(&self, new_pdf: NewPdf) -> PortResult<Pdf>;
    /// Unordered.
    async fn get_pdfs_by_user(&self, user_id: i64) -> PortResult<Vec<Pdf>>;
    async fn get_pdf(&self, id: i64) -> PortResult<Option<Pdf>>;

    // --- Chat operations ---
    async fn create_chat(&self, new_chat: NewChat) -> PortResult<Chat>;
    /// Ordered by `created_at` descending (most recent first).
    async fn get_chats_by_user(&self, user_id: i64) -> PortResult<Vec<Chat>>;
    async fn get_chat(&self, id: i64) -> PortResult<Option<Chat>>;

    // --- Message operations ---
    async fn create_message(&self, new_message: NewMessage) -> PortResult<Message>;
    /// Ordered by `created_at` ascending.
    async fn get_messages_by_chat(&self, chat_id: i64) -> PortResult<Vec<Message>>;
}

/// The AI proxy contract: answer a question about a document by forwarding
/// a templated prompt to an external language model.
#[async_trait]
pub trait DocumentQaService: Send + Sync {
    /// Builds the prompt from the document text and the user's question and
    /// returns the provider's text response verbatim. Provider failures are
    /// reported as `PortError::Upstream`; never retried here.
    async fn answer(&self, pdf_content: &str, message: &str) -> PortResult<String>;
}

//! crates/pdf_chat_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};

/// Represents a registered account.
///
/// `password` always holds the Argon2 hash of the user's password,
/// never the plaintext. The web layer is responsible for stripping it
/// before serialization.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Insert form of [`User`]; the id is assigned by the storage engine.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Represents an uploaded PDF. `content` is the extracted text, treated
/// as opaque by everything below the web layer.
#[derive(Debug, Clone)]
pub struct Pdf {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPdf {
    pub user_id: i64,
    pub name: String,
    pub content: String,
}

/// A conversation owned by a user, optionally anchored to one PDF.
/// The owner never changes after creation.
#[derive(Debug, Clone)]
pub struct Chat {
    pub id: i64,
    pub user_id: i64,
    pub pdf_id: Option<i64>,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewChat {
    pub user_id: i64,
    pub pdf_id: Option<i64>,
    pub title: String,
}

/// A single turn in a chat. `is_user` distinguishes human-authored
/// messages from AI responses.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: i64,
    pub chat_id: i64,
    pub content: String,
    pub is_user: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub chat_id: i64,
    pub content: String,
    pub is_user: bool,
}

//! services/api/src/adapters/mem.rs
//!
//! The ephemeral storage adapter: an in-process implementation of the
//! `PdfStorage` port backed by plain maps. Used when no `DATABASE_URL` is
//! configured. Nothing here survives a process restart.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use pdf_chat_core::domain::{Chat, Message, NewChat, NewMessage, NewPdf, NewUser, Pdf, User};
use pdf_chat_core::ports::{PdfStorage, PortError, PortResult};
use tokio::sync::Mutex;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// All collections and id counters live behind a single mutex, so every
/// operation (including the duplicate-email check inside `create_user`)
/// is atomic with respect to concurrent requests.
#[derive(Default)]
struct Inner {
    users: HashMap<i64, User>,
    pdfs: HashMap<i64, Pdf>,
    chats: HashMap<i64, Chat>,
    messages: HashMap<i64, Message>,
    next_user_id: i64,
    next_pdf_id: i64,
    next_chat_id: i64,
    next_message_id: i64,
}

/// An in-memory storage adapter that implements the `PdfStorage` port.
pub struct MemStorage {
    inner: Mutex<Inner>,
}

impl MemStorage {
    /// Creates an empty store. Ids for every entity type start at 1 and are
    /// never reused within the process lifetime.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_user_id: 1,
                next_pdf_id: 1,
                next_chat_id: 1,
                next_message_id: 1,
                ..Inner::default()
            }),
        }
    }
}

impl Default for MemStorage {
    fn default() -> Self {
        Self::new()
    }
}

//=========================================================================================
// `PdfStorage` Trait Implementation
//=========================================================================================

#[async_trait]
impl PdfStorage for MemStorage {
    async fn get_user(&self, id: i64) -> PortResult<Option<User>> {
        let inner = self.inner.lock().await;
        Ok(inner.users.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<Option<User>> {
        let inner = self.inner.lock().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, new_user: NewUser) -> PortResult<User> {
        let mut inner = self.inner.lock().await;
        if inner.users.values().any(|u| u.email == new_user.email) {
            return Err(PortError::Conflict(format!(
                "email {} is already registered",
                new_user.email
            )));
        }
        let id = inner.next_user_id;
        inner.next_user_id += 1;
        let user = User {
            id,
            email: new_user.email,
            password: new_user.password,
            name: new_user.name,
        };
        inner.users.insert(id, user.clone());
        Ok(user)
    }

    async fn create_pdf(&self, new_pdf: NewPdf) -> PortResult<Pdf> {
        let mut inner = self.inner.lock().await;
        let id = inner.next_pdf_id;
        inner.next_pdf_id += 1;
        let pdf = Pdf {
            id,
            user_id: new_pdf.user_id,
            name: new_pdf.name,
            content: new_pdf.content,
            created_at: Utc::now(),
        };
        inner.pdfs.insert(id, pdf.clone());
        Ok(pdf)
    }

    async fn get_pdfs_by_user(&self, user_id: i64) -> PortResult<Vec<Pdf>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .pdfs
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_pdf(&self, id: i64) -> PortResult<Option<Pdf>> {
        let inner = self.inner.lock().await;
        Ok(inner.pdfs.get(&id).cloned())
    }

    async fn create_chat(&self, new_chat: NewChat) -> PortResult<Chat> {
        let mut inner = self.inner.lock().await;
        let id = inner.next_chat_id;
        inner.next_chat_id += 1;
        let chat = Chat {
            id,
            user_id: new_chat.user_id,
            pdf_id: new_chat.pdf_id,
            title: new_chat.title,
            created_at: Utc::now(),
        };
        inner.chats.insert(id, chat.clone());
        Ok(chat)
    }

    async fn get_chats_by_user(&self, user_id: i64) -> PortResult<Vec<Chat>> {
        let inner = self.inner.lock().await;
        let mut chats: Vec<Chat> = inner
            .chats
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        // Most recent first; id breaks ties for inserts within one tick.
        chats.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(chats)
    }

    async fn get_chat(&self, id: i64) -> PortResult<Option<Chat>> {
        let inner = self.inner.lock().await;
        Ok(inner.chats.get(&id).cloned())
    }

    async fn create_message(&self, new_message: NewMessage) -> PortResult<Message> {
        let mut inner = self.inner.lock().await;
        let id = inner.next_message_id;
        inner.next_message_id += 1;
        let message = Message {
            id,
            chat_id: new_message.chat_id,
            content: new_message.content,
            is_user: new_message.is_user,
            created_at: Utc::now(),
        };
        inner.messages.insert(id, message.clone());
        Ok(message)
    }

    async fn get_messages_by_chat(&self, chat_id: i64) -> PortResult<Vec<Message>> {
        let inner = self.inner.lock().await;
        let mut messages: Vec<Message> = inner
            .messages
            .values()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        Ok(messages)
    }
}

//=========================================================================================
// Test Helpers
//=========================================================================================

#[cfg(test)]
impl MemStorage {
    /// Overwrites a chat's timestamp so ordering tests can insert rows
    /// out of chronological order.
    async fn backdate_chat(&self, id: i64, created_at: chrono::DateTime<Utc>) {
        let mut inner = self.inner.lock().await;
        if let Some(chat) = inner.chats.get_mut(&id) {
            chat.created_at = created_at;
        }
    }

    async fn backdate_message(&self, id: i64, created_at: chrono::DateTime<Utc>) {
        let mut inner = self.inner.lock().await;
        if let Some(message) = inner.messages.get_mut(&id) {
            message.created_at = created_at;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password: "hash".to_string(),
            name: "Test User".to_string(),
        }
    }

    #[tokio::test]
    async fn create_user_assigns_monotonic_ids() {
        let store = MemStorage::new();
        let a = store.create_user(new_user("a@example.com")).await.unwrap();
        let b = store.create_user(new_user("b@example.com")).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemStorage::new();
        store.create_user(new_user("dup@example.com")).await.unwrap();
        let err = store
            .create_user(new_user("dup@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Conflict(_)));
        // The losing insert must not have consumed the slot.
        assert!(store
            .get_user_by_email("dup@example.com")
            .await
            .unwrap()
            .is_some());
        assert!(store.get_user(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_user_by_email_finds_exact_match_only() {
        let store = MemStorage::new();
        store.create_user(new_user("one@example.com")).await.unwrap();
        assert!(store
            .get_user_by_email("one@example.com")
            .await
            .unwrap()
            .is_some());
        assert!(store
            .get_user_by_email("two@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn chats_are_listed_most_recent_first() {
        let store = MemStorage::new();
        let user = store.create_user(new_user("c@example.com")).await.unwrap();
        let mut ids = Vec::new();
        for title in ["first", "second", "third", "fourth"] {
            let chat = store
                .create_chat(NewChat {
                    user_id: user.id,
                    pdf_id: None,
                    title: title.to_string(),
                })
                .await
                .unwrap();
            ids.push(chat.id);
        }
        // Scramble timestamps so insertion order and chronological order differ.
        let base = Utc::now();
        store.backdate_chat(ids[0], base - Duration::hours(1)).await;
        store.backdate_chat(ids[1], base - Duration::hours(4)).await;
        store.backdate_chat(ids[2], base - Duration::hours(2)).await;
        store.backdate_chat(ids[3], base - Duration::hours(3)).await;

        let chats = store.get_chats_by_user(user.id).await.unwrap();
        let titles: Vec<&str> = chats.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["first", "third", "fourth", "second"]);
        assert!(chats.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }

    #[tokio::test]
    async fn messages_are_listed_oldest_first() {
        let store = MemStorage::new();
        let user = store.create_user(new_user("m@example.com")).await.unwrap();
        let chat = store
            .create_chat(NewChat {
                user_id: user.id,
                pdf_id: None,
                title: "chat".to_string(),
            })
            .await
            .unwrap();
        let mut ids = Vec::new();
        for content in ["one", "two", "three"] {
            let message = store
                .create_message(NewMessage {
                    chat_id: chat.id,
                    content: content.to_string(),
                    is_user: true,
                })
                .await
                .unwrap();
            ids.push(message.id);
        }
        let base = Utc::now();
        store
            .backdate_message(ids[0], base - Duration::minutes(5))
            .await;
        store
            .backdate_message(ids[1], base - Duration::minutes(15))
            .await;
        store
            .backdate_message(ids[2], base - Duration::minutes(10))
            .await;

        let messages = store.get_messages_by_chat(chat.id).await.unwrap();
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["two", "three", "one"]);
        assert!(messages
            .windows(2)
            .all(|w| w[0].created_at <= w[1].created_at));
    }

    #[tokio::test]
    async fn collections_are_scoped_to_their_owner() {
        let store = MemStorage::new();
        let a = store.create_user(new_user("owner-a@example.com")).await.unwrap();
        let b = store.create_user(new_user("owner-b@example.com")).await.unwrap();
        store
            .create_pdf(NewPdf {
                user_id: a.id,
                name: "a.pdf".to_string(),
                content: "alpha".to_string(),
            })
            .await
            .unwrap();
        store
            .create_pdf(NewPdf {
                user_id: b.id,
                name: "b.pdf".to_string(),
                content: "beta".to_string(),
            })
            .await
            .unwrap();

        let a_pdfs = store.get_pdfs_by_user(a.id).await.unwrap();
        assert_eq!(a_pdfs.len(), 1);
        assert_eq!(a_pdfs[0].name, "a.pdf");
        assert_eq!(a_pdfs[0].content, "alpha");
    }
}

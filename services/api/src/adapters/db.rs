//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, the durable implementation of
//! the `PdfStorage` port. It handles all interactions with the PostgreSQL
//! database using `sqlx`.
//!
//! Every operation is a single statement; there are no multi-statement
//! transactions. Uniqueness and foreign keys are also enforced by the
//! schema, so a duplicate email loses at the insert itself.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pdf_chat_core::domain::{Chat, Message, NewChat, NewMessage, NewPdf, NewUser, Pdf, User};
use pdf_chat_core::ports::{PdfStorage, PortError, PortResult};
use sqlx::{FromRow, PgPool};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `PdfStorage` port.
#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    /// Creates a new `PgStorage`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: i64,
    email: String,
    password: String,
    name: String,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            email: self.email,
            password: self.password,
            name: self.name,
        }
    }
}

#[derive(FromRow)]
struct PdfRecord {
    id: i64,
    user_id: i64,
    name: String,
    content: String,
    created_at: DateTime<Utc>,
}
impl PdfRecord {
    fn to_domain(self) -> Pdf {
        Pdf {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            content: self.content,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct ChatRecord {
    id: i64,
    user_id: i64,
    pdf_id: Option<i64>,
    title: String,
    created_at: DateTime<Utc>,
}
impl ChatRecord {
    fn to_domain(self) -> Chat {
        Chat {
            id: self.id,
            user_id: self.user_id,
            pdf_id: self.pdf_id,
            title: self.title,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct MessageRecord {
    id: i64,
    chat_id: i64,
    content: String,
    is_user: bool,
    created_at: DateTime<Utc>,
}
impl MessageRecord {
    fn to_domain(self) -> Message {
        Message {
            id: self.id,
            chat_id: self.chat_id,
            content: self.content,
            is_user: self.is_user,
            created_at: self.created_at,
        }
    }
}

//=========================================================================================
// `PdfStorage` Trait Implementation
//=========================================================================================

#[async_trait]
impl PdfStorage for PgStorage {
    async fn get_user(&self, id: i64) -> PortResult<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, email, password, name FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(UserRecord::to_domain))
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, email, password, name FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(UserRecord::to_domain))
    }

    async fn create_user(&self, new_user: NewUser) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (email, password, name) VALUES ($1, $2, $3) \
             RETURNING id, email, password, name",
        )
        .bind(&new_user.email)
        .bind(&new_user.password)
        .bind(&new_user.name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db)
                if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation) =>
            {
                PortError::Conflict(format!("email {} is already registered", new_user.email))
            }
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn create_pdf(&self, new_pdf: NewPdf) -> PortResult<Pdf> {
        let record = sqlx::query_as::<_, PdfRecord>(
            "INSERT INTO pdfs (user_id, name, content) VALUES ($1, $2, $3) \
             RETURNING id, user_id, name, content, created_at",
        )
        .bind(new_pdf.user_id)
        .bind(&new_pdf.name)
        .bind(&new_pdf.content)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_pdfs_by_user(&self, user_id: i64) -> PortResult<Vec<Pdf>> {
        let records = sqlx::query_as::<_, PdfRecord>(
            "SELECT id, user_id, name, content, created_at FROM pdfs WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(PdfRecord::to_domain).collect())
    }

    async fn get_pdf(&self, id: i64) -> PortResult<Option<Pdf>> {
        let record = sqlx::query_as::<_, PdfRecord>(
            "SELECT id, user_id, name, content, created_at FROM pdfs WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(PdfRecord::to_domain))
    }

    async fn create_chat(&self, new_chat: NewChat) -> PortResult<Chat> {
        let record = sqlx::query_as::<_, ChatRecord>(
            "INSERT INTO chats (user_id, pdf_id, title) VALUES ($1, $2, $3) \
             RETURNING id, user_id, pdf_id, title, created_at",
        )
        .bind(new_chat.user_id)
        .bind(new_chat.pdf_id)
        .bind(&new_chat.title)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_chats_by_user(&self, user_id: i64) -> PortResult<Vec<Chat>> {
        let records = sqlx::query_as::<_, ChatRecord>(
            "SELECT id, user_id, pdf_id, title, created_at FROM chats \
             WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(ChatRecord::to_domain).collect())
    }

    async fn get_chat(&self, id: i64) -> PortResult<Option<Chat>> {
        let record = sqlx::query_as::<_, ChatRecord>(
            "SELECT id, user_id, pdf_id, title, created_at FROM chats WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(ChatRecord::to_domain))
    }

    async fn create_message(&self, new_message: NewMessage) -> PortResult<Message> {
        let record = sqlx::query_as::<_, MessageRecord>(
            "INSERT INTO messages (chat_id, content, is_user) VALUES ($1, $2, $3) \
             RETURNING id, chat_id, content, is_user, created_at",
        )
        .bind(new_message.chat_id)
        .bind(&new_message.content)
        .bind(new_message.is_user)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_messages_by_chat(&self, chat_id: i64) -> PortResult<Vec<Message>> {
        let records = sqlx::query_as::<_, MessageRecord>(
            "SELECT id, chat_id, content, is_user, created_at FROM messages \
             WHERE chat_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(MessageRecord::to_domain).collect())
    }
}

//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the entity REST endpoints and the Gemini
//! proxy, plus the master definition for the OpenAPI specification.
//!
//! Every handler runs behind `require_auth`. Ownership-scoped resources are
//! checked by re-fetching the parent row and comparing its owner against
//! the session user: 404 when the parent is missing, 403 when it belongs
//! to someone else.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use pdf_chat_core::domain::{Chat, Message, NewChat, NewMessage, NewPdf, Pdf};
use pdf_chat_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{OpenApi, ToSchema};

use crate::web::auth::{LogoutResponse, UserResponse};
use crate::web::middleware::CurrentUser;
use crate::web::respond::{failure, invalid, storage_failure, Failure, FieldError};
use crate::web::state::AppState;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::register_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        crate::web::auth::current_user_handler,
        create_pdf_handler,
        list_pdfs_handler,
        create_chat_handler,
        list_chats_handler,
        get_chat_handler,
        create_message_handler,
        list_messages_handler,
        gemini_handler,
    ),
    components(schemas(
        crate::web::auth::RegisterRequest,
        crate::web::auth::LoginRequest,
        UserResponse,
        LogoutResponse,
        CreatePdfRequest,
        PdfResponse,
        CreateChatRequest,
        ChatResponse,
        CreateMessageRequest,
        MessageResponse,
        GeminiRequest,
        GeminiResponse,
    )),
    tags(
        (name = "PDF Chat API", description = "Session-authenticated CRUD over users, PDFs, chats and messages, plus a Gemini proxy.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CreatePdfRequest {
    pub name: String,
    pub content: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PdfResponse {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<Pdf> for PdfResponse {
    fn from(pdf: Pdf) -> Self {
        Self {
            id: pdf.id,
            user_id: pdf.user_id,
            name: pdf.name,
            content: pdf.content,
            created_at: pdf.created_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatRequest {
    pub title: String,
    #[serde(default)]
    pub pdf_id: Option<i64>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub id: i64,
    pub user_id: i64,
    pub pdf_id: Option<i64>,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

impl From<Chat> for ChatResponse {
    fn from(chat: Chat) -> Self {
        Self {
            id: chat.id,
            user_id: chat.user_id,
            pdf_id: chat.pdf_id,
            title: chat.title,
            created_at: chat.created_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageRequest {
    pub chat_id: i64,
    pub content: String,
    pub is_user: bool,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: i64,
    pub chat_id: i64,
    pub content: String,
    pub is_user: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            chat_id: message.chat_id,
            content: message.content,
            is_user: message.is_user,
            created_at: message.created_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    pub pdf_content: String,
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct GeminiResponse {
    pub response: String,
}

//=========================================================================================
// Ownership Check
//=========================================================================================

/// Fetches a chat and verifies it belongs to the session user.
async fn owned_chat(state: &AppState, chat_id: i64, user_id: i64) -> Result<Chat, Failure> {
    let chat = state
        .storage
        .get_chat(chat_id)
        .await
        .map_err(|e| storage_failure("Failed to get chat", e))?
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "Chat not found"))?;

    if chat.user_id != user_id {
        return Err(failure(StatusCode::FORBIDDEN, "Forbidden"));
    }
    Ok(chat)
}

//=========================================================================================
// PDF Handlers
//=========================================================================================

/// POST /api/pdfs - Store an uploaded PDF's extracted text
#[utoipa::path(
    post,
    path = "/api/pdfs",
    request_body = CreatePdfRequest,
    responses(
        (status = 201, description = "PDF created", body = PdfResponse),
        (status = 400, description = "Validation failure"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn create_pdf_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(req): Json<CreatePdfRequest>,
) -> Result<impl IntoResponse, Failure> {
    if req.name.trim().is_empty() {
        return Err(invalid(
            "Invalid PDF data",
            vec![FieldError::required("name")],
        ));
    }

    let pdf = state
        .storage
        .create_pdf(NewPdf {
            user_id,
            name: req.name,
            content: req.content,
        })
        .await
        .map_err(|e| storage_failure("Failed to create PDF", e))?;

    Ok((StatusCode::CREATED, Json(PdfResponse::from(pdf))))
}

/// GET /api/pdfs - List the session user's PDFs
#[utoipa::path(
    get,
    path = "/api/pdfs",
    responses(
        (status = 200, description = "The user's PDFs", body = [PdfResponse]),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_pdfs_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, Failure> {
    let pdfs = state
        .storage
        .get_pdfs_by_user(user_id)
        .await
        .map_err(|e| storage_failure("Failed to get PDFs", e))?;

    let body: Vec<PdfResponse> = pdfs.into_iter().map(PdfResponse::from).collect();
    Ok((StatusCode::OK, Json(body)))
}

//=========================================================================================
// Chat Handlers
//=========================================================================================

/// POST /api/chats - Create a chat, optionally anchored to a PDF
#[utoipa::path(
    post,
    path = "/api/chats",
    request_body = CreateChatRequest,
    responses(
        (status = 201, description = "Chat created", body = ChatResponse),
        (status = 400, description = "Validation failure"),
        (status = 403, description = "Referenced PDF belongs to another user"),
        (status = 404, description = "Referenced PDF does not exist")
    )
)]
pub async fn create_chat_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(req): Json<CreateChatRequest>,
) -> Result<impl IntoResponse, Failure> {
    if req.title.trim().is_empty() {
        return Err(invalid(
            "Invalid chat data",
            vec![FieldError::required("title")],
        ));
    }

    // A supplied pdfId must resolve to a PDF the session user owns.
    if let Some(pdf_id) = req.pdf_id {
        let pdf = state
            .storage
            .get_pdf(pdf_id)
            .await
            .map_err(|e| storage_failure("Failed to get PDF", e))?
            .ok_or_else(|| failure(StatusCode::NOT_FOUND, "PDF not found"))?;
        if pdf.user_id != user_id {
            return Err(failure(StatusCode::FORBIDDEN, "Forbidden"));
        }
    }

    let chat = state
        .storage
        .create_chat(NewChat {
            user_id,
            pdf_id: req.pdf_id,
            title: req.title,
        })
        .await
        .map_err(|e| storage_failure("Failed to create chat", e))?;

    Ok((StatusCode::CREATED, Json(ChatResponse::from(chat))))
}

/// GET /api/chats - List the session user's chats, most recent first
#[utoipa::path(
    get,
    path = "/api/chats",
    responses(
        (status = 200, description = "The user's chats, newest first", body = [ChatResponse]),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_chats_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, Failure> {
    let chats = state
        .storage
        .get_chats_by_user(user_id)
        .await
        .map_err(|e| storage_failure("Failed to get chats", e))?;

    let body: Vec<ChatResponse> = chats.into_iter().map(ChatResponse::from).collect();
    Ok((StatusCode::OK, Json(body)))
}

/// GET /api/chats/{id} - Fetch one chat
#[utoipa::path(
    get,
    path = "/api/chats/{id}",
    params(("id" = i64, Path, description = "Chat id")),
    responses(
        (status = 200, description = "The chat", body = ChatResponse),
        (status = 403, description = "Chat belongs to another user"),
        (status = 404, description = "Chat not found")
    )
)]
pub async fn get_chat_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, Failure> {
    let chat = owned_chat(&state, id, user_id).await?;
    Ok((StatusCode::OK, Json(ChatResponse::from(chat))))
}

//=========================================================================================
// Message Handlers
//=========================================================================================

/// POST /api/messages - Append a message to an owned chat
#[utoipa::path(
    post,
    path = "/api/messages",
    request_body = CreateMessageRequest,
    responses(
        (status = 201, description = "Message created", body = MessageResponse),
        (status = 400, description = "Validation failure"),
        (status = 403, description = "Chat belongs to another user"),
        (status = 404, description = "Chat not found")
    )
)]
pub async fn create_message_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(req): Json<CreateMessageRequest>,
) -> Result<impl IntoResponse, Failure> {
    if req.content.is_empty() {
        return Err(invalid(
            "Invalid message data",
            vec![FieldError::required("content")],
        ));
    }

    owned_chat(&state, req.chat_id, user_id).await?;

    let message = state
        .storage
        .create_message(NewMessage {
            chat_id: req.chat_id,
            content: req.content,
            is_user: req.is_user,
        })
        .await
        .map_err(|e| storage_failure("Failed to create message", e))?;

    Ok((StatusCode::CREATED, Json(MessageResponse::from(message))))
}

/// GET /api/chats/{id}/messages - List a chat's messages, oldest first
#[utoipa::path(
    get,
    path = "/api/chats/{id}/messages",
    params(("id" = i64, Path, description = "Chat id")),
    responses(
        (status = 200, description = "The chat's messages, oldest first", body = [MessageResponse]),
        (status = 403, description = "Chat belongs to another user"),
        (status = 404, description = "Chat not found")
    )
)]
pub async fn list_messages_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, Failure> {
    owned_chat(&state, id, user_id).await?;

    let messages = state
        .storage
        .get_messages_by_chat(id)
        .await
        .map_err(|e| storage_failure("Failed to get messages", e))?;

    let body: Vec<MessageResponse> = messages.into_iter().map(MessageResponse::from).collect();
    Ok((StatusCode::OK, Json(body)))
}

//=========================================================================================
// Gemini Proxy Handler
//=========================================================================================

/// POST /api/gemini - Forward a question about a PDF to the Gemini API
#[utoipa::path(
    post,
    path = "/api/gemini",
    request_body = GeminiRequest,
    responses(
        (status = 200, description = "The model's response", body = GeminiResponse),
        (status = 400, description = "Missing PDF content or message"),
        (status = 404, description = "The Gemini API call failed"),
        (status = 500, description = "No Gemini API key configured")
    )
)]
pub async fn gemini_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(_user_id)): Extension<CurrentUser>,
    Json(req): Json<GeminiRequest>,
) -> Result<impl IntoResponse, Failure> {
    // Validated before the provider is ever contacted.
    let mut errors = Vec::new();
    if req.pdf_content.is_empty() {
        errors.push(FieldError::required("pdfContent"));
    }
    if req.message.is_empty() {
        errors.push(FieldError::required("message"));
    }
    if !errors.is_empty() {
        return Err(invalid("PDF content and message are required", errors));
    }

    // A missing credential is a configuration error, distinct from a
    // provider failure.
    let qa_adapter = state.qa_adapter.as_ref().ok_or_else(|| {
        failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Gemini API key is not configured",
        )
    })?;

    let response = qa_adapter
        .answer(&req.pdf_content, &req.message)
        .await
        .map_err(|e| match e {
            PortError::Upstream(detail) => {
                error!("Gemini API error: {}", detail);
                failure(
                    StatusCode::NOT_FOUND,
                    "Failed to get response from Gemini API. Please make sure your API key is correct and try again.",
                )
            }
            other => storage_failure("Failed to process your request", other),
        })?;

    Ok((StatusCode::OK, Json(GeminiResponse { response })))
}

use actix_multipart::Multipart;
use actix_web::{delete, get, post, put, web, HttpResponse};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::api::models::{CreateSessionRequest, UpdateTitleRequest};
use crate::api::upload;
use crate::chat::dispatch::ChatService;
use crate::chat::ChatError;
use crate::config::AppConfig;
use crate::genai::GenerativeModel;
use crate::store::models::AuthUser;
use crate::store::{BlobStore, RecordStore};

// --- Chat ---

#[post("/chat")]
pub async fn chat(
    service: web::Data<ChatService>,
    user: AuthUser,
    payload: Multipart,
) -> Result<HttpResponse, ChatError> {
    let submission = upload::parse_chat_form(payload).await?;
    let response = service.submit(&user, submission).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[get("/models")]
pub async fn list_models(
    model: web::Data<Arc<dyn GenerativeModel>>,
) -> Result<HttpResponse, ChatError> {
    let models = model.list_models().await?;
    Ok(HttpResponse::Ok().json(json!({ "models": models })))
}

// --- Sessions ---

#[get("/sessions")]
pub async fn list_sessions(
    records: web::Data<Arc<dyn RecordStore>>,
    user: AuthUser,
) -> Result<HttpResponse, ChatError> {
    let owner_id = resolve_owner(records.get_ref().as_ref(), &user).await?;
    let sessions = records.list_sessions(owner_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "sessions": sessions })))
}

#[post("/sessions")]
pub async fn create_session(
    records: web::Data<Arc<dyn RecordStore>>,
    config: web::Data<AppConfig>,
    user: AuthUser,
    req: web::Json<CreateSessionRequest>,
) -> Result<HttpResponse, ChatError> {
    let owner_id = resolve_owner(records.get_ref().as_ref(), &user).await?;
    let req = req.into_inner();

    let title = req
        .title
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or("New conversation");
    let model = req
        .model
        .as_deref()
        .filter(|m| !m.is_empty())
        .unwrap_or(&config.gemini.default_model);

    let session_id = records.create_session(owner_id, title, model).await?;
    Ok(HttpResponse::Ok().json(json!({ "sessionId": session_id })))
}

#[get("/sessions/{id}/history")]
pub async fn session_history(
    records: web::Data<Arc<dyn RecordStore>>,
    user: AuthUser,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, ChatError> {
    let id = id.into_inner();
    let owner_id = resolve_owner(records.get_ref().as_ref(), &user).await?;

    records
        .fetch_session(id, owner_id)
        .await?
        .ok_or(ChatError::Authorization)?;

    let messages = records.fetch_history(id).await?;
    Ok(HttpResponse::Ok().json(json!({ "messages": messages })))
}

#[put("/sessions/{id}/title")]
pub async fn update_title(
    records: web::Data<Arc<dyn RecordStore>>,
    user: AuthUser,
    id: web::Path<Uuid>,
    req: web::Json<UpdateTitleRequest>,
) -> Result<HttpResponse, ChatError> {
    let id = id.into_inner();
    let owner_id = resolve_owner(records.get_ref().as_ref(), &user).await?;

    records
        .fetch_session(id, owner_id)
        .await?
        .ok_or(ChatError::Authorization)?;

    records.update_title(id, &req.title).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

#[delete("/sessions/{id}")]
pub async fn delete_session(
    records: web::Data<Arc<dyn RecordStore>>,
    blobs: web::Data<Arc<dyn BlobStore>>,
    user: AuthUser,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, ChatError> {
    let id = id.into_inner();
    let owner_id = resolve_owner(records.get_ref().as_ref(), &user).await?;

    records
        .fetch_session(id, owner_id)
        .await?
        .ok_or(ChatError::Authorization)?;

    // Storage cleanup is best-effort; a failure is logged but never keeps
    // the records alive.
    match records.list_file_paths(id).await {
        Ok(paths) if !paths.is_empty() => {
            info!("Deleting {} stored files for session {}", paths.len(), id);
            if let Err(e) = blobs.remove(&paths).await {
                error!("Failed to delete session files from storage: {}", e);
            }
        }
        Ok(_) => {}
        Err(e) => error!("Failed to list files for session {}: {}", id, e),
    }

    records.delete_session(id).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

async fn resolve_owner(records: &dyn RecordStore, user: &AuthUser) -> Result<Uuid, ChatError> {
    records
        .fetch_user(&user.id)
        .await?
        .ok_or(ChatError::NotFound("User"))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(chat)
            .service(list_models)
            .service(list_sessions)
            .service(create_session)
            .service(session_history)
            .service(update_title)
            .service(delete_session),
    );
}

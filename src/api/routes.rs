use actix_web::{
    delete, error::ErrorInternalServerError, error::ErrorUnauthorized, get, post, put, web,
    HttpResponse, Result as WebResult,
};
use std::sync::{Arc, MutexGuard};
use uuid::Uuid;

use crate::api::middleware::LoginState;
use crate::api::models::{
    CreateDocumentRequest, DocumentQuery, SendMessageRequest, SendMessageResponse,
    UpdateSettingsRequest,
};
use crate::llm::LlmProvider;
use crate::rag::{self, ChatError};
use crate::store::models::User;
use crate::store::{ChatStore, SharedStore, StoreError};

fn lock(store: &SharedStore) -> WebResult<MutexGuard<'_, ChatStore>> {
    store
        .lock()
        .map_err(|_| ErrorInternalServerError("store lock poisoned"))
}

fn current_user(auth: &LoginState) -> WebResult<User> {
    auth.current().ok_or_else(|| ErrorUnauthorized("Not signed in"))
}

fn store_error(e: StoreError) -> HttpResponse {
    match e {
        StoreError::Validation(msg) => HttpResponse::BadRequest().body(msg),
        StoreError::InvalidSession(id) => {
            HttpResponse::NotFound().body(format!("Session {} not found", id))
        }
        StoreError::PermissionDenied(msg) => HttpResponse::Forbidden().body(msg),
        e => HttpResponse::InternalServerError().body(e.to_string()),
    }
}

fn chat_error(e: ChatError) -> HttpResponse {
    match e {
        ChatError::MissingCredential(msg) => HttpResponse::ServiceUnavailable().body(msg),
        ChatError::Store(e) => store_error(e),
    }
}

// --- Login ---

#[post("/login")]
pub async fn login(auth: web::Data<LoginState>) -> WebResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(auth.login()?))
}

#[post("/logout")]
pub async fn logout(
    auth: web::Data<LoginState>,
    store: web::Data<SharedStore>,
) -> WebResult<HttpResponse> {
    auth.logout()?;
    lock(&store)?.clear_active_session();
    Ok(HttpResponse::NoContent().finish())
}

#[get("/me")]
pub async fn me(auth: web::Data<LoginState>) -> WebResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(current_user(&auth)?))
}

// --- Sessions ---

#[post("")]
pub async fn create_session(store: web::Data<SharedStore>) -> WebResult<HttpResponse> {
    let mut store = lock(&store)?;

    match store.create_session() {
        Ok(session) => Ok(HttpResponse::Created().json(session)),
        Err(e) => Ok(store_error(e)),
    }
}

#[get("")]
pub async fn list_sessions(store: web::Data<SharedStore>) -> WebResult<HttpResponse> {
    let store = lock(&store)?;
    Ok(HttpResponse::Ok().json(store.sessions()))
}

#[get("/{id}")]
pub async fn get_session(
    store: web::Data<SharedStore>,
    id: web::Path<Uuid>,
) -> WebResult<HttpResponse> {
    let store = lock(&store)?;

    match store.session(id.into_inner()) {
        Some(session) => Ok(HttpResponse::Ok().json(session)),
        None => Ok(HttpResponse::NotFound().finish()),
    }
}

#[delete("/{id}")]
pub async fn delete_session(
    store: web::Data<SharedStore>,
    id: web::Path<Uuid>,
) -> WebResult<HttpResponse> {
    let mut store = lock(&store)?;

    match store.delete_session(id.into_inner()) {
        Ok(true) => Ok(HttpResponse::NoContent().finish()),
        Ok(false) => Ok(HttpResponse::NotFound().finish()),
        Err(e) => Ok(store_error(e)),
    }
}

#[post("/{id}/select")]
pub async fn select_session(
    store: web::Data<SharedStore>,
    id: web::Path<Uuid>,
) -> WebResult<HttpResponse> {
    let mut store = lock(&store)?;

    match store.select_session(id.into_inner()) {
        Ok(session) => Ok(HttpResponse::Ok().json(session)),
        Err(e) => Ok(store_error(e)),
    }
}

// --- Messages ---

#[get("/{id}/messages")]
pub async fn get_messages(
    store: web::Data<SharedStore>,
    id: web::Path<Uuid>,
) -> WebResult<HttpResponse> {
    let store = lock(&store)?;

    match store.session(id.into_inner()) {
        Some(session) => Ok(HttpResponse::Ok().json(&session.messages)),
        None => Ok(HttpResponse::NotFound().finish()),
    }
}

#[post("/{id}/messages")]
pub async fn send_message(
    store: web::Data<SharedStore>,
    llm: web::Data<Arc<dyn LlmProvider>>,
    auth: web::Data<LoginState>,
    id: web::Path<Uuid>,
    req: web::Json<SendMessageRequest>,
) -> WebResult<HttpResponse> {
    let user = current_user(&auth)?;

    match rag::send_message(
        store.get_ref(),
        llm.get_ref().as_ref(),
        &user,
        id.into_inner(),
        &req.content,
    )
    .await
    {
        Ok(exchange) => Ok(HttpResponse::Created().json(SendMessageResponse::from(exchange))),
        Err(e) => Ok(chat_error(e)),
    }
}

// --- Documents ---

#[get("")]
pub async fn list_documents(
    store: web::Data<SharedStore>,
    auth: web::Data<LoginState>,
    query: web::Query<DocumentQuery>,
) -> WebResult<HttpResponse> {
    let user = current_user(&auth)?;
    let store = lock(&store)?;

    let documents: Vec<_> = store
        .documents_for(&user)
        .into_iter()
        .filter(|d| query.scope.map_or(true, |scope| d.scope == scope))
        .collect();
    Ok(HttpResponse::Ok().json(documents))
}

#[post("")]
pub async fn create_document(
    store: web::Data<SharedStore>,
    auth: web::Data<LoginState>,
    req: web::Json<CreateDocumentRequest>,
) -> WebResult<HttpResponse> {
    let user = current_user(&auth)?;
    let mut store = lock(&store)?;
    let req = req.into_inner();

    match store.add_document(&user, &req.title, &req.content, req.scope) {
        Ok(document) => Ok(HttpResponse::Created().json(document)),
        Err(e) => Ok(store_error(e)),
    }
}

#[delete("/{id}")]
pub async fn delete_document(
    store: web::Data<SharedStore>,
    auth: web::Data<LoginState>,
    id: web::Path<Uuid>,
) -> WebResult<HttpResponse> {
    let user = current_user(&auth)?;
    let mut store = lock(&store)?;

    match store.delete_document(&user, id.into_inner()) {
        Ok(_) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(store_error(e)),
    }
}

// --- Settings ---

#[get("/settings")]
pub async fn get_settings(store: web::Data<SharedStore>) -> WebResult<HttpResponse> {
    let store = lock(&store)?;
    Ok(HttpResponse::Ok().json(store.settings()))
}

#[put("/settings")]
pub async fn update_settings(
    store: web::Data<SharedStore>,
    req: web::Json<UpdateSettingsRequest>,
) -> WebResult<HttpResponse> {
    let mut store = lock(&store)?;
    let settings = req.apply(store.settings());

    match store.update_settings(settings) {
        Ok(settings) => Ok(HttpResponse::Ok().json(settings)),
        Err(e) => Ok(store_error(e)),
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(login)
        .service(logout)
        .service(me)
        .service(get_settings)
        .service(update_settings)
        .service(
            web::scope("/sessions")
                .service(create_session)
                .service(list_sessions)
                .service(get_session)
                .service(delete_session)
                .service(select_session)
                .service(get_messages)
                .service(send_message),
        )
        .service(
            web::scope("/documents")
                .service(list_documents)
                .service(create_document)
                .service(delete_document),
        );
}

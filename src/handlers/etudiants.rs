use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::ApiError;
use crate::store::{error::StoreError, EtudiantFilter, EtudiantPatch, EtudiantStore, NewEtudiant};

pub type SharedStore = Arc<dyn EtudiantStore>;

/// Read-path store failures (malformed ids included) surface as 500 with the
/// raw error text; there is no dedicated 400 path for bad ids.
fn erreur_serveur(err: StoreError) -> ApiError {
    ApiError::server_error(err.to_string())
}

/// POST / - create a student.
pub async fn create(
    State(store): State<SharedStore>,
    Json(payload): Json<NewEtudiant>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::debug!(?payload, "creating etudiant");

    // Best-effort duplicate-name check before touching create; the store only
    // guarantees uniqueness on email.
    if let (Some(nom), Some(prenom)) = (payload.nom.as_deref(), payload.prenom.as_deref()) {
        let existing = store
            .find_by_nom_prenom(nom, prenom)
            .await
            .map_err(|err| ApiError::bad_request_with("Données invalides", err.to_string()))?;
        if existing.is_some() {
            return Err(ApiError::bad_request(
                "Un étudiant avec le même nom et prénom existe déjà",
            ));
        }
    }

    let etudiant = store.create(payload).await.map_err(|err| match err {
        StoreError::DuplicateEmail => ApiError::bad_request("Cet email existe déjà"),
        other => ApiError::bad_request_with("Données invalides", other.to_string()),
    })?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Étudiant créé avec succès",
            "data": etudiant
        })),
    ))
}

/// GET / - list active students.
pub async fn list(State(store): State<SharedStore>) -> Result<impl IntoResponse, ApiError> {
    let filter = EtudiantFilter {
        actif: Some(true),
        ..Default::default()
    };
    let etudiants = store.find_all(&filter).await.map_err(erreur_serveur)?;

    Ok(Json(json!({
        "success": true,
        "count": etudiants.len(),
        "data": etudiants
    })))
}

/// GET /:id - fetch one student.
pub async fn get_by_id(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::debug!(%id, "fetching etudiant");

    let etudiant = store
        .find_by_id(&id)
        .await
        .map_err(erreur_serveur)?
        .ok_or_else(|| ApiError::not_found("Étudiant non trouvé"))?;

    Ok(Json(json!({
        "success": true,
        "data": etudiant
    })))
}

/// PUT /:id - partial update. Every store failure on this path, malformed id
/// included, comes back as 400 with the update message.
pub async fn update(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
    Json(patch): Json<EtudiantPatch>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::debug!(%id, ?patch, "updating etudiant");

    let etudiant = store
        .update_by_id(&id, patch)
        .await
        .map_err(|err| ApiError::bad_request_with("Erreur de mise à jour", err.to_string()))?
        .ok_or_else(|| ApiError::not_found("Étudiant non trouvé"))?;

    Ok(Json(json!({
        "success": true,
        "message": "Étudiant mis à jour avec succès",
        "data": etudiant
    })))
}

/// DELETE /:id - soft-delete: flips `actif` to false, never removes the row.
pub async fn delete(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::debug!(%id, "deactivating etudiant");

    let etudiant = store
        .set_active_flag(&id, false)
        .await
        .map_err(erreur_serveur)?
        .ok_or_else(|| ApiError::not_found("Étudiant non trouvé"))?;

    Ok(Json(json!({
        "success": true,
        "message": "Étudiant désactivé avec succès",
        "data": etudiant
    })))
}

/// GET /filiere/:filiere - exact-match listing, regardless of actif state.
pub async fn by_filiere(
    State(store): State<SharedStore>,
    Path(filiere): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::debug!(%filiere, "listing etudiants by filiere");

    let filter = EtudiantFilter {
        filiere: Some(filiere.clone()),
        ..Default::default()
    };
    let etudiants = store.find_all(&filter).await.map_err(erreur_serveur)?;

    Ok(Json(json!({
        "success": true,
        "count": etudiants.len(),
        "filiere": filiere,
        "data": etudiants
    })))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// GET /search?q= - case-insensitive substring search on nom OR prenom,
/// across all actif states.
pub async fn search(
    State(store): State<SharedStore>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let q = match query.q.filter(|q| !q.is_empty()) {
        Some(q) => q,
        None => return Err(ApiError::bad_request("Paramètre de recherche manquant (q)")),
    };

    let filter = EtudiantFilter {
        nom_ou_prenom_contains: Some(q.clone()),
        ..Default::default()
    };
    let etudiants = store.find_all(&filter).await.map_err(erreur_serveur)?;

    Ok(Json(json!({
        "success": true,
        "count": etudiants.len(),
        "query": q,
        "data": etudiants
    })))
}

/// GET /disabled - students that have been soft-deleted.
pub async fn disabled(State(store): State<SharedStore>) -> Result<impl IntoResponse, ApiError> {
    let filter = EtudiantFilter {
        actif: Some(false),
        ..Default::default()
    };
    let etudiants = store.find_all(&filter).await.map_err(erreur_serveur)?;

    Ok(Json(json!({
        "success": true,
        "count": etudiants.len(),
        "data": etudiants
    })))
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AdvancedSearchQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nom: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filiere: Option<String>,
    #[serde(rename = "anneeMin", skip_serializing_if = "Option::is_none")]
    pub annee_min: Option<i32>,
    #[serde(rename = "anneeMax", skip_serializing_if = "Option::is_none")]
    pub annee_max: Option<i32>,
    #[serde(rename = "moyenneMin", skip_serializing_if = "Option::is_none")]
    pub moyenne_min: Option<f64>,
}

/// GET /search/advanced - composite filter over optional criteria, always
/// restricted to active records. Echoes the provided parameters back under
/// `filters`.
pub async fn advanced_search(
    State(store): State<SharedStore>,
    Query(query): Query<AdvancedSearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = EtudiantFilter {
        actif: Some(true),
        nom_contains: query.nom.clone(),
        filiere: query.filiere.clone(),
        annee_min: query.annee_min,
        annee_max: query.annee_max,
        moyenne_min: query.moyenne_min,
        nom_ou_prenom_contains: None,
    };
    let etudiants = store.find_all(&filter).await.map_err(erreur_serveur)?;

    Ok(Json(json!({
        "success": true,
        "count": etudiants.len(),
        "filters": query,
        "data": etudiants
    })))
}

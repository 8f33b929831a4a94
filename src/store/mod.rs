pub mod error;
pub mod memory;
pub mod pg;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use self::error::StoreError;

/// A single student record. Field names are the API contract and stay in
/// French end to end.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Etudiant {
    pub id: Uuid,
    pub nom: String,
    pub prenom: String,
    pub moyenne: Option<f64>,
    pub filiere: Option<String>,
    pub annee: Option<i32>,
    pub email: Option<String>,
    pub actif: bool,
}

/// Request body for creation. `nom` and `prenom` are required but arrive as
/// options so their absence reaches the store as a validation failure rather
/// than a deserialization error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewEtudiant {
    pub nom: Option<String>,
    pub prenom: Option<String>,
    pub moyenne: Option<f64>,
    pub filiere: Option<String>,
    pub annee: Option<i32>,
    pub email: Option<String>,
}

impl NewEtudiant {
    /// Validate required fields and build the record the store will insert.
    /// The store assigns the id; `actif` defaults to true.
    pub(crate) fn into_record(self) -> Result<Etudiant, StoreError> {
        let nom = required(self.nom, "nom")?;
        let prenom = required(self.prenom, "prenom")?;

        Ok(Etudiant {
            id: Uuid::new_v4(),
            nom,
            prenom,
            moyenne: self.moyenne,
            filiere: self.filiere,
            annee: self.annee,
            email: self.email,
            actif: true,
        })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, StoreError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(StoreError::Validation(format!(
            "Le champ '{}' est requis",
            field
        ))),
    }
}

/// Partial update. Absent fields are left untouched; the merged record is
/// re-validated before it is written back.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EtudiantPatch {
    pub nom: Option<String>,
    pub prenom: Option<String>,
    pub moyenne: Option<f64>,
    pub filiere: Option<String>,
    pub annee: Option<i32>,
    pub email: Option<String>,
    pub actif: Option<bool>,
}

impl EtudiantPatch {
    pub(crate) fn apply(&self, record: &mut Etudiant) {
        if let Some(nom) = &self.nom {
            record.nom = nom.clone();
        }
        if let Some(prenom) = &self.prenom {
            record.prenom = prenom.clone();
        }
        if let Some(moyenne) = self.moyenne {
            record.moyenne = Some(moyenne);
        }
        if let Some(filiere) = &self.filiere {
            record.filiere = Some(filiere.clone());
        }
        if let Some(annee) = self.annee {
            record.annee = Some(annee);
        }
        if let Some(email) = &self.email {
            record.email = Some(email.clone());
        }
        if let Some(actif) = self.actif {
            record.actif = actif;
        }
    }
}

/// Re-validation applied after a patch merge.
pub(crate) fn validate(record: &Etudiant) -> Result<(), StoreError> {
    if record.nom.trim().is_empty() {
        return Err(StoreError::Validation(
            "Le champ 'nom' est requis".to_string(),
        ));
    }
    if record.prenom.trim().is_empty() {
        return Err(StoreError::Validation(
            "Le champ 'prenom' est requis".to_string(),
        ));
    }
    Ok(())
}

/// Equality/substring/range criteria for `find_all`. All fields are optional
/// and combine with AND.
#[derive(Debug, Clone, Default)]
pub struct EtudiantFilter {
    pub actif: Option<bool>,
    /// Exact match on the track name.
    pub filiere: Option<String>,
    /// Case-insensitive substring on `nom`.
    pub nom_contains: Option<String>,
    /// Case-insensitive substring on `nom` OR `prenom`.
    pub nom_ou_prenom_contains: Option<String>,
    pub annee_min: Option<i32>,
    pub annee_max: Option<i32>,
    pub moyenne_min: Option<f64>,
}

impl EtudiantFilter {
    /// Predicate form of the filter, used by the in-memory backend. The SQL
    /// backend compiles the same criteria to a WHERE clause.
    pub fn matches(&self, record: &Etudiant) -> bool {
        if let Some(actif) = self.actif {
            if record.actif != actif {
                return false;
            }
        }
        if let Some(filiere) = &self.filiere {
            if record.filiere.as_deref() != Some(filiere.as_str()) {
                return false;
            }
        }
        if let Some(needle) = &self.nom_contains {
            if !contains_ci(&record.nom, needle) {
                return false;
            }
        }
        if let Some(needle) = &self.nom_ou_prenom_contains {
            if !contains_ci(&record.nom, needle) && !contains_ci(&record.prenom, needle) {
                return false;
            }
        }
        if let Some(min) = self.annee_min {
            match record.annee {
                Some(annee) if annee >= min => {}
                _ => return false,
            }
        }
        if let Some(max) = self.annee_max {
            match record.annee {
                Some(annee) if annee <= max => {}
                _ => return false,
            }
        }
        if let Some(min) = self.moyenne_min {
            match record.moyenne {
                Some(moyenne) if moyenne >= min => {}
                _ => return false,
            }
        }
        true
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

pub(crate) fn parse_id(id: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(id).map_err(|_| StoreError::MalformedId(id.to_string()))
}

/// Backend seam for the student collection. Records are never physically
/// removed; soft-delete goes through `set_active_flag`.
#[async_trait]
pub trait EtudiantStore: Send + Sync {
    /// Insert a new record. Fails with `DuplicateEmail` when the email
    /// collides with any existing record, active or not.
    async fn create(&self, fields: NewEtudiant) -> Result<Etudiant, StoreError>;

    /// All records matching the filter, in insertion order.
    async fn find_all(&self, filter: &EtudiantFilter) -> Result<Vec<Etudiant>, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Etudiant>, StoreError>;

    /// First record with this exact nom + prenom, used for the best-effort
    /// duplicate-name check at creation.
    async fn find_by_nom_prenom(
        &self,
        nom: &str,
        prenom: &str,
    ) -> Result<Option<Etudiant>, StoreError>;

    /// Merge a partial patch into the record, re-validate, write back.
    async fn update_by_id(
        &self,
        id: &str,
        patch: EtudiantPatch,
    ) -> Result<Option<Etudiant>, StoreError>;

    /// Targeted update of `actif` only.
    async fn set_active_flag(&self, id: &str, active: bool)
        -> Result<Option<Etudiant>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

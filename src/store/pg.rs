use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::error::StoreError;
use super::{parse_id, validate, Etudiant, EtudiantFilter, EtudiantPatch, EtudiantStore, NewEtudiant};

const COLUMNS: &str = "id, nom, prenom, moyenne, filiere, annee, email, actif";

/// PostgreSQL-backed student store. Email uniqueness is enforced by a unique
/// index, so concurrent duplicate creates resolve at the database rather than
/// in the handlers.
pub struct PgEtudiantStore {
    pool: PgPool,
}

impl PgEtudiantStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Idempotent schema bootstrap, run once at startup. The `seq` column
    /// only exists to give `find_all` a stable insertion order.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS etudiants (
                seq     BIGSERIAL,
                id      UUID PRIMARY KEY,
                nom     TEXT NOT NULL,
                prenom  TEXT NOT NULL,
                moyenne DOUBLE PRECISION,
                filiere TEXT,
                annee   INTEGER,
                email   TEXT,
                actif   BOOLEAN NOT NULL DEFAULT TRUE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS etudiants_email_key ON etudiants (email)",
        )
        .execute(&self.pool)
        .await?;

        tracing::info!("etudiants schema ready");
        Ok(())
    }

    async fn write_back(&self, record: &Etudiant) -> Result<Etudiant, StoreError> {
        let updated = sqlx::query_as::<_, Etudiant>(
            "UPDATE etudiants \
             SET nom = $2, prenom = $3, moyenne = $4, filiere = $5, annee = $6, email = $7, actif = $8 \
             WHERE id = $1 \
             RETURNING id, nom, prenom, moyenne, filiere, annee, email, actif",
        )
        .bind(record.id)
        .bind(&record.nom)
        .bind(&record.prenom)
        .bind(record.moyenne)
        .bind(&record.filiere)
        .bind(record.annee)
        .bind(&record.email)
        .bind(record.actif)
        .fetch_one(&self.pool)
        .await
        .map_err(map_constraint_error)?;

        Ok(updated)
    }
}

/// Unique-violation on the email index becomes the store-level duplicate
/// condition; everything else passes through.
fn map_constraint_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateEmail,
        _ => StoreError::Sqlx(err),
    }
}

/// Escape LIKE wildcards before wrapping the needle in `%...%`.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl EtudiantStore for PgEtudiantStore {
    async fn create(&self, fields: NewEtudiant) -> Result<Etudiant, StoreError> {
        let record = fields.into_record()?;

        sqlx::query(
            "INSERT INTO etudiants (id, nom, prenom, moyenne, filiere, annee, email, actif) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(record.id)
        .bind(&record.nom)
        .bind(&record.prenom)
        .bind(record.moyenne)
        .bind(&record.filiere)
        .bind(record.annee)
        .bind(&record.email)
        .bind(record.actif)
        .execute(&self.pool)
        .await
        .map_err(map_constraint_error)?;

        Ok(record)
    }

    async fn find_all(&self, filter: &EtudiantFilter) -> Result<Vec<Etudiant>, StoreError> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM etudiants WHERE 1 = 1", COLUMNS));

        if let Some(actif) = filter.actif {
            qb.push(" AND actif = ").push_bind(actif);
        }
        if let Some(filiere) = &filter.filiere {
            qb.push(" AND filiere = ").push_bind(filiere.clone());
        }
        if let Some(needle) = &filter.nom_contains {
            qb.push(" AND nom ILIKE ").push_bind(like_pattern(needle));
        }
        if let Some(needle) = &filter.nom_ou_prenom_contains {
            let pattern = like_pattern(needle);
            qb.push(" AND (nom ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR prenom ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(min) = filter.annee_min {
            qb.push(" AND annee >= ").push_bind(min);
        }
        if let Some(max) = filter.annee_max {
            qb.push(" AND annee <= ").push_bind(max);
        }
        if let Some(min) = filter.moyenne_min {
            qb.push(" AND moyenne >= ").push_bind(min);
        }

        qb.push(" ORDER BY seq");

        let records = qb
            .build_query_as::<Etudiant>()
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Etudiant>, StoreError> {
        let id = parse_id(id)?;
        let record = sqlx::query_as::<_, Etudiant>(&format!(
            "SELECT {} FROM etudiants WHERE id = $1",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn find_by_nom_prenom(
        &self,
        nom: &str,
        prenom: &str,
    ) -> Result<Option<Etudiant>, StoreError> {
        let record = sqlx::query_as::<_, Etudiant>(&format!(
            "SELECT {} FROM etudiants WHERE nom = $1 AND prenom = $2 ORDER BY seq LIMIT 1",
            COLUMNS
        ))
        .bind(nom)
        .bind(prenom)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn update_by_id(
        &self,
        id: &str,
        patch: EtudiantPatch,
    ) -> Result<Option<Etudiant>, StoreError> {
        let mut record = match self.find_by_id(id).await? {
            Some(record) => record,
            None => return Ok(None),
        };

        patch.apply(&mut record);
        validate(&record)?;

        let updated = self.write_back(&record).await?;
        Ok(Some(updated))
    }

    async fn set_active_flag(
        &self,
        id: &str,
        active: bool,
    ) -> Result<Option<Etudiant>, StoreError> {
        let id = parse_id(id)?;
        let record = sqlx::query_as::<_, Etudiant>(&format!(
            "UPDATE etudiants SET actif = $2 WHERE id = $1 RETURNING {}",
            COLUMNS
        ))
        .bind(id)
        .bind(active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

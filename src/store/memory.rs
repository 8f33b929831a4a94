use async_trait::async_trait;
use tokio::sync::RwLock;

use super::error::StoreError;
use super::{parse_id, validate, Etudiant, EtudiantFilter, EtudiantPatch, EtudiantStore, NewEtudiant};

/// In-memory student store with the same semantics as the Postgres backend:
/// email uniqueness across every actif state, insertion order preserved by
/// the backing Vec. Used by the test suite and for running the API without a
/// database.
#[derive(Default)]
pub struct MemoryEtudiantStore {
    records: RwLock<Vec<Etudiant>>,
}

impl MemoryEtudiantStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_taken(records: &[Etudiant], email: &str, except: Option<uuid::Uuid>) -> bool {
    records
        .iter()
        .any(|r| r.email.as_deref() == Some(email) && Some(r.id) != except)
}

#[async_trait]
impl EtudiantStore for MemoryEtudiantStore {
    async fn create(&self, fields: NewEtudiant) -> Result<Etudiant, StoreError> {
        let record = fields.into_record()?;

        let mut records = self.records.write().await;
        if let Some(email) = &record.email {
            if email_taken(&records, email, None) {
                return Err(StoreError::DuplicateEmail);
            }
        }

        records.push(record.clone());
        Ok(record)
    }

    async fn find_all(&self, filter: &EtudiantFilter) -> Result<Vec<Etudiant>, StoreError> {
        let records = self.records.read().await;
        Ok(records.iter().filter(|r| filter.matches(r)).cloned().collect())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Etudiant>, StoreError> {
        let id = parse_id(id)?;
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_nom_prenom(
        &self,
        nom: &str,
        prenom: &str,
    ) -> Result<Option<Etudiant>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .find(|r| r.nom == nom && r.prenom == prenom)
            .cloned())
    }

    async fn update_by_id(
        &self,
        id: &str,
        patch: EtudiantPatch,
    ) -> Result<Option<Etudiant>, StoreError> {
        let id = parse_id(id)?;
        let mut records = self.records.write().await;

        let Some(index) = records.iter().position(|r| r.id == id) else {
            return Ok(None);
        };

        let mut merged = records[index].clone();
        patch.apply(&mut merged);
        validate(&merged)?;

        if let Some(email) = &merged.email {
            if email_taken(&records, email, Some(id)) {
                return Err(StoreError::DuplicateEmail);
            }
        }

        records[index] = merged.clone();
        Ok(Some(merged))
    }

    async fn set_active_flag(
        &self,
        id: &str,
        active: bool,
    ) -> Result<Option<Etudiant>, StoreError> {
        let id = parse_id(id)?;
        let mut records = self.records.write().await;

        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };

        record.actif = active;
        Ok(Some(record.clone()))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid(nom: &str, prenom: &str, email: &str) -> NewEtudiant {
        NewEtudiant {
            nom: Some(nom.to_string()),
            prenom: Some(prenom.to_string()),
            moyenne: Some(15.0),
            filiere: Some("Informatique".to_string()),
            annee: Some(2),
            email: Some(email.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_assigns_id_and_defaults_actif() {
        let store = MemoryEtudiantStore::new();
        let created = store
            .create(valid("Dupont", "Alice", "alice@test.com"))
            .await
            .unwrap();

        assert!(created.actif);

        let fetched = store.find_by_id(&created.id.to_string()).await.unwrap();
        assert_eq!(fetched.unwrap().nom, "Dupont");
    }

    #[tokio::test]
    async fn create_rejects_duplicate_email_even_when_inactive() {
        let store = MemoryEtudiantStore::new();
        let created = store
            .create(valid("Dupont", "Alice", "alice@test.com"))
            .await
            .unwrap();

        // Soft-delete does not free the email.
        store
            .set_active_flag(&created.id.to_string(), false)
            .await
            .unwrap();

        let err = store
            .create(valid("Martin", "Bob", "alice@test.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
    }

    #[tokio::test]
    async fn create_without_nom_is_a_validation_error() {
        let store = MemoryEtudiantStore::new();
        let err = store
            .create(NewEtudiant {
                prenom: Some("Alice".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn find_all_preserves_insertion_order() {
        let store = MemoryEtudiantStore::new();
        store
            .create(valid("Dupont", "Alice", "a@test.com"))
            .await
            .unwrap();
        store
            .create(valid("Martin", "Bob", "b@test.com"))
            .await
            .unwrap();

        let all = store.find_all(&EtudiantFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].nom, "Dupont");
        assert_eq!(all[1].nom, "Martin");
    }

    #[tokio::test]
    async fn update_merges_and_revalidates() {
        let store = MemoryEtudiantStore::new();
        let created = store
            .create(valid("Dupont", "Alice", "alice@test.com"))
            .await
            .unwrap();
        let id = created.id.to_string();

        let updated = store
            .update_by_id(
                &id,
                EtudiantPatch {
                    moyenne: Some(17.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.moyenne, Some(17.0));
        assert_eq!(updated.nom, "Dupont");

        let err = store
            .update_by_id(
                &id,
                EtudiantPatch {
                    nom: Some("".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn update_rejects_email_collision_with_other_record() {
        let store = MemoryEtudiantStore::new();
        store
            .create(valid("Dupont", "Alice", "alice@test.com"))
            .await
            .unwrap();
        let bob = store
            .create(valid("Martin", "Bob", "bob@test.com"))
            .await
            .unwrap();

        let err = store
            .update_by_id(
                &bob.id.to_string(),
                EtudiantPatch {
                    email: Some("alice@test.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
    }

    #[tokio::test]
    async fn soft_delete_keeps_the_record() {
        let store = MemoryEtudiantStore::new();
        let created = store
            .create(valid("Dupont", "Alice", "alice@test.com"))
            .await
            .unwrap();
        let id = created.id.to_string();

        let disabled = store.set_active_flag(&id, false).await.unwrap().unwrap();
        assert!(!disabled.actif);

        // Still reachable by id, just inactive.
        let fetched = store.find_by_id(&id).await.unwrap().unwrap();
        assert!(!fetched.actif);
    }

    #[tokio::test]
    async fn malformed_id_is_rejected_by_every_id_operation() {
        let store = MemoryEtudiantStore::new();

        assert!(matches!(
            store.find_by_id("nope").await,
            Err(StoreError::MalformedId(_))
        ));
        assert!(matches!(
            store.update_by_id("nope", EtudiantPatch::default()).await,
            Err(StoreError::MalformedId(_))
        ));
        assert!(matches!(
            store.set_active_flag("nope", false).await,
            Err(StoreError::MalformedId(_))
        ));
    }
}

use crate::error::SchoolError;
use crate::image_storage::StorageResolver;
use crate::models::{School, SchoolForm};
use crate::school_store::SchoolStore;
use crate::validation;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Registers, lists and removes schools.
///
/// Requests are handled strictly in sequence: validation, then image
/// resolution, then persistence. Nothing is stored when validation fails.
#[derive(Clone)]
pub struct SchoolService {
    store: Arc<dyn SchoolStore>,
    images: StorageResolver,
}

impl SchoolService {
    pub fn new(store: Arc<dyn SchoolStore>, images: StorageResolver) -> Self {
        Self { store, images }
    }

    pub fn store(&self) -> &Arc<dyn SchoolStore> {
        &self.store
    }

    #[instrument(skip(self, form), fields(name = %form.name.trim()))]
    pub async fn register(&self, form: SchoolForm) -> Result<School, SchoolError> {
        let mut school = validation::validate(&form).map_err(|e| {
            warn!(reason = e.code(), "School submission rejected");
            metrics::counter!("schools.validation.rejected", "reason" => e.code()).increment(1);
            e
        })?;

        school.image = self.images.resolve(form.image.as_ref()).await.map_err(|e| {
            error!(operation = "resolve_image", error = %e, "Image storage failed");
            SchoolError::ImageStorageFailed(e)
        })?;

        let created = self.store.create(&school).await.map_err(|e| {
            error!(operation = "create_school", error = %e, "Failed to persist school");
            SchoolError::Persistence(e)
        })?;

        metrics::counter!("schools.created").increment(1);
        info!(id = created.id, image = ?created.image, "School registered");

        Ok(created)
    }

    pub async fn list(&self) -> Result<Vec<School>, SchoolError> {
        self.store.list().await.map_err(|e| {
            error!(operation = "list_schools", error = %e, "Failed to list schools");
            SchoolError::Persistence(e)
        })
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<(), SchoolError> {
        self.store.delete_by_id(id).await.map_err(|e| {
            let err = SchoolError::from(e);
            if matches!(err, SchoolError::NotFound(_)) {
                warn!(id, "Delete requested for unknown school");
            } else {
                error!(operation = "delete_school", error = %err, "Failed to delete school");
            }
            err
        })?;

        metrics::counter!("schools.deleted").increment(1);
        info!(id, "School deleted");
        Ok(())
    }
}

use tracing::{info, instrument};
use validator::Validate;

use super::degrade;
use crate::errors::ServiceError;
use crate::events::{Change, ChangeFeed};
use crate::models::{id_or_new, SopCategory, SopCategoryInput, SopDocument, SopDocumentInput};
use crate::schedule::SharedClock;
use crate::store::{OrderBy, StoreHandle};

/// Standard operating procedure categories and documents
#[derive(Clone)]
pub struct SopService {
    store: StoreHandle,
    feed: ChangeFeed,
    clock: SharedClock,
}

impl SopService {
    pub fn new(store: StoreHandle, feed: ChangeFeed, clock: SharedClock) -> Self {
        Self { store, feed, clock }
    }

    pub async fn list_categories(&self) -> Result<Vec<SopCategory>, ServiceError> {
        let categories = match self.store.require() {
            Ok(store) => store.sop_categories().list(Some(&OrderBy::asc("name"))).await,
            Err(e) => Err(e),
        };
        degrade(categories, "SOP categories")
    }

    #[instrument(skip(self))]
    pub async fn upsert_category(&self, input: SopCategoryInput) -> Result<SopCategory, ServiceError> {
        input.validate()?;
        let name = input.name.trim();
        if name.is_empty() {
            return Err(ServiceError::ValidationError("category name is required".into()));
        }
        let store = self.store.require()?;
        let category = SopCategory {
            id: id_or_new(input.id),
            name: name.to_string(),
            description: input.description,
        };
        store.sop_categories().upsert(vec![category.clone()]).await?;
        self.feed.publish(Change::SopCategories);
        Ok(category)
    }

    /// Deletes the category together with its documents, documents first.
    #[instrument(skip(self))]
    pub async fn delete_category(&self, id: &str) -> Result<usize, ServiceError> {
        let store = self.store.require()?;
        if store.sop_categories().get(id).await?.is_none() {
            return Err(category_not_found(id));
        }
        let documents: Vec<SopDocument> = store
            .sop_documents()
            .list(None)
            .await?
            .into_iter()
            .filter(|doc| doc.category_id == id)
            .collect();
        for doc in &documents {
            store.sop_documents().delete(&doc.id).await?;
        }
        store.sop_categories().delete(id).await?;
        info!(category_id = %id, documents = documents.len(), "SOP category deleted");
        if !documents.is_empty() {
            self.feed.publish(Change::SopDocuments);
        }
        self.feed.publish(Change::SopCategories);
        Ok(documents.len())
    }

    /// Documents sorted by title, optionally for one category.
    pub async fn list_documents(&self, category_id: Option<&str>) -> Result<Vec<SopDocument>, ServiceError> {
        let documents = match self.store.require() {
            Ok(store) => store.sop_documents().list(Some(&OrderBy::asc("title"))).await,
            Err(e) => Err(e),
        };
        let documents = degrade(documents, "SOP documents")?;
        Ok(match category_id {
            Some(category_id) => documents
                .into_iter()
                .filter(|doc| doc.category_id == category_id)
                .collect(),
            None => documents,
        })
    }

    /// Saves a document under an existing category, stamping today's date.
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn upsert_document(&self, input: SopDocumentInput) -> Result<SopDocument, ServiceError> {
        input.validate()?;
        let title = input.title.trim();
        if title.is_empty() {
            return Err(ServiceError::ValidationError("document title is required".into()));
        }
        let store = self.store.require()?;
        if store.sop_categories().get(&input.category_id).await?.is_none() {
            return Err(category_not_found(&input.category_id));
        }
        let document = SopDocument {
            id: id_or_new(input.id),
            category_id: input.category_id,
            title: title.to_string(),
            content: input.content,
            updated_at: self.clock.today(),
        };
        store.sop_documents().upsert(vec![document.clone()]).await?;
        self.feed.publish(Change::SopDocuments);
        Ok(document)
    }

    #[instrument(skip(self))]
    pub async fn delete_document(&self, id: &str) -> Result<(), ServiceError> {
        let store = self.store.require()?;
        if store.sop_documents().get(id).await?.is_none() {
            return Err(ServiceError::NotFound(format!("SOP document {} not found", id)));
        }
        store.sop_documents().delete(id).await?;
        self.feed.publish(Change::SopDocuments);
        Ok(())
    }
}

fn category_not_found(id: &str) -> ServiceError {
    ServiceError::NotFound(format!("SOP category {} not found", id))
}

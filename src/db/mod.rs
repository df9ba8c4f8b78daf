pub mod query;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::client::{Client, Scope, UNIQUE_ID};
use crate::error::{Error, Result};
use crate::models::{Document, DocumentList};

pub use query::Query;

impl Client {
    /// Create a record in a collection. The backend assigns the id.
    /// Compensation for anything done before this call (an uploaded blob,
    /// say) stays with the caller.
    pub async fn create_document<T, S>(&self, collection: &str, data: &S) -> Result<Document<T>>
    where
        T: DeserializeOwned,
        S: Serialize + ?Sized,
    {
        let body = serde_json::json!({ "documentId": UNIQUE_ID, "data": data });
        let rb = self.post(&self.documents_path(collection))?.json(&body);
        self.send_json(rb, Scope::Document).await
    }

    pub async fn get_document<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Document<T>> {
        let path = format!("{}/{}", self.documents_path(collection), id);
        let rb = self.get(&path)?;
        self.send_json(rb, Scope::Document).await
    }

    /// Partial update: attributes absent from `data` keep their stored
    /// values. Updating an unknown id is `NotFound`, never an insert.
    pub async fn update_document<T, S>(
        &self,
        collection: &str,
        id: &str,
        data: &S,
    ) -> Result<Document<T>>
    where
        T: DeserializeOwned,
        S: Serialize + ?Sized,
    {
        let path = format!("{}/{}", self.documents_path(collection), id);
        let body = serde_json::json!({ "data": data });
        let rb = self.patch(&path)?.json(&body);
        self.send_json(rb, Scope::Document).await
    }

    /// Delete a record. "Already gone" counts as deleted.
    pub async fn delete_document(&self, collection: &str, id: &str) -> Result<()> {
        let path = format!("{}/{}", self.documents_path(collection), id);
        let rb = self.delete(&path)?;
        match self.send_no_content(rb, Scope::Document).await {
            Err(Error::NotFound(_)) => {
                tracing::debug!("document {} in {} was already deleted", id, collection);
                Ok(())
            }
            other => other,
        }
    }

    /// One page of documents matching the predicates. Pagination follows a
    /// cursor (the last-seen document id), never an offset, so concurrent
    /// inserts cannot skip or duplicate rows across pages.
    pub async fn list_documents<T: DeserializeOwned>(
        &self,
        collection: &str,
        queries: &[Query],
    ) -> Result<DocumentList<T>> {
        let params: Vec<(&str, String)> =
            queries.iter().map(|q| ("queries[]", q.encode())).collect();
        let rb = self.get(&self.documents_path(collection))?.query(&params);
        self.send_json(rb, Scope::Document).await
    }

    /// Full-text match on one attribute. Result order is backend-defined
    /// relevance.
    pub async fn search_documents<T: DeserializeOwned>(
        &self,
        collection: &str,
        attribute: &str,
        term: &str,
    ) -> Result<DocumentList<T>> {
        self.list_documents(collection, &[Query::search(attribute, term)])
            .await
    }

    fn documents_path(&self, collection: &str) -> String {
        format!(
            "databases/{}/collections/{}/documents",
            self.config().database.id,
            collection
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::client::Client;
    use crate::config::Config;

    fn test_client() -> Client {
        let mut config = Config::default();
        config.backend.endpoint = "https://backend.example.com/v1".into();
        config.backend.project_id = "proj1".into();
        config.database.id = "db1".into();
        config.database.users_collection = "users".into();
        config.database.posts_collection = "posts".into();
        config.database.saves_collection = "saves".into();
        config.storage.bucket_id = "media".into();
        Client::new(config).unwrap()
    }

    #[test]
    fn documents_path_includes_database_and_collection() {
        let client = test_client();
        assert_eq!(
            client.documents_path("posts"),
            "databases/db1/collections/posts/documents"
        );
    }
}

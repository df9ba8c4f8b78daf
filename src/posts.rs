use serde_json::json;

use crate::client::Client;
use crate::db::Query;
use crate::error::{Error, Result};
use crate::models::{Document, DocumentList, Post, SavedPost};
use crate::storage::{ImageUpload, PreviewOptions};

/// Input for publishing a post. `tags` is the raw comma-separated string
/// as typed.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub creator: String,
    pub caption: String,
    pub location: Option<String>,
    pub tags: Option<String>,
    pub image: ImageUpload,
}

/// Changes to apply to a post. Caption, location and tags are replaced
/// wholesale; the image only when a new upload is supplied.
#[derive(Debug, Clone)]
pub struct PostUpdate {
    pub caption: String,
    pub location: Option<String>,
    pub tags: Option<String>,
    pub image: Option<ImageUpload>,
}

/// Split a raw tag string on commas and trim each piece. Nothing else is
/// normalized: empty segments and duplicates pass through as written.
pub fn normalize_tags(raw: Option<&str>) -> Vec<String> {
    match raw {
        Some(raw) => raw.split(',').map(|tag| tag.trim().to_string()).collect(),
        None => Vec::new(),
    }
}

impl Client {
    /// Publish a post: upload the image, derive its preview URL, then write
    /// the document referencing both. If the document write fails the
    /// uploaded blob is deleted again, so no step leaves a blob that
    /// nothing references.
    pub async fn create_post(&self, input: NewPost) -> Result<Document<Post>> {
        const WORKFLOW: &str = "create_post";
        if input.creator.is_empty() {
            return Err(Error::Validation("a post needs a creator".into()));
        }

        let file = self
            .upload_file(&input.image.file_name, input.image.bytes.clone())
            .await
            .map_err(|e| Error::workflow(WORKFLOW, "upload", e))?;

        let url = match self.file_preview_url(&file.id, &PreviewOptions::default()) {
            Ok(url) => url,
            Err(e) => {
                self.discard_blob(&file.id, WORKFLOW).await;
                return Err(Error::workflow(WORKFLOW, "preview", e));
            }
        };

        let post = Post {
            creator: input.creator,
            caption: input.caption,
            image_url: url.to_string(),
            image_id: file.id.clone(),
            location: input.location,
            tags: normalize_tags(input.tags.as_deref()),
            likes: Vec::new(),
        };
        let posts = self.config().database.posts_collection.as_str();
        match self.create_document(posts, &post).await {
            Ok(doc) => Ok(doc),
            Err(e) => {
                self.discard_blob(&file.id, WORKFLOW).await;
                Err(Error::workflow(WORKFLOW, "document", e))
            }
        }
    }

    /// Edit a post. When a new image comes along it is uploaded before the
    /// document is touched, so there is never a moment where the post
    /// references a missing image: on update failure the new blob is
    /// removed and the document still points at the old one; on success the
    /// old blob is deleted last.
    pub async fn update_post(&self, post_id: &str, update: PostUpdate) -> Result<Document<Post>> {
        const WORKFLOW: &str = "update_post";
        if post_id.is_empty() {
            return Err(Error::Validation("a post id is required".into()));
        }

        let posts = self.config().database.posts_collection.as_str();
        let current: Document<Post> = self
            .get_document(posts, post_id)
            .await
            .map_err(|e| Error::workflow(WORKFLOW, "fetch", e))?;

        let new_image = match &update.image {
            Some(upload) => {
                let file = self
                    .upload_file(&upload.file_name, upload.bytes.clone())
                    .await
                    .map_err(|e| Error::workflow(WORKFLOW, "upload", e))?;
                match self.file_preview_url(&file.id, &PreviewOptions::default()) {
                    Ok(url) => Some((file.id, url)),
                    Err(e) => {
                        self.discard_blob(&file.id, WORKFLOW).await;
                        return Err(Error::workflow(WORKFLOW, "preview", e));
                    }
                }
            }
            None => None,
        };

        let (image_id, image_url) = match &new_image {
            Some((id, url)) => (id.clone(), url.to_string()),
            None => (current.data.image_id.clone(), current.data.image_url.clone()),
        };
        // Likes are deliberately absent here: an edit must not clobber
        // likes that arrived since the post was fetched.
        let payload = json!({
            "caption": update.caption,
            "location": update.location,
            "imageUrl": image_url,
            "imageId": image_id,
            "tags": normalize_tags(update.tags.as_deref()),
        });

        let updated = match self.update_document(posts, post_id, &payload).await {
            Ok(doc) => doc,
            Err(e) => {
                if let Some((id, _)) = &new_image {
                    self.discard_blob(id, WORKFLOW).await;
                }
                return Err(Error::workflow(WORKFLOW, "document", e));
            }
        };

        if new_image.is_some() {
            let old_id = &current.data.image_id;
            if let Err(err) = self.delete_file(old_id).await {
                tracing::warn!(
                    "post {} updated but its old image {} was not deleted: {}",
                    post_id,
                    old_id,
                    err
                );
            }
        }
        Ok(updated)
    }

    /// Delete a post, then its image. Fails fast unless both ids are
    /// supplied. The document goes first; a blob-delete failure afterwards
    /// is logged as a leak rather than failing a delete the user has
    /// already seen succeed.
    pub async fn delete_post(&self, post_id: &str, image_id: &str) -> Result<()> {
        if post_id.is_empty() || image_id.is_empty() {
            return Err(Error::Validation(
                "deleting a post requires both the post id and its image id".into(),
            ));
        }
        let posts = self.config().database.posts_collection.as_str();
        self.delete_document(posts, post_id)
            .await
            .map_err(|e| Error::workflow("delete_post", "document", e))?;

        if let Err(err) = self.delete_file(image_id).await {
            tracing::warn!(
                "post {} deleted but its image {} was not: {}",
                post_id,
                image_id,
                err
            );
        }
        Ok(())
    }

    /// Replace the likes set on a post. The caller computes the new set
    /// from the one it last read; two sessions toggling at once can
    /// overwrite each other, and nothing on this side guards against that.
    pub async fn like_post(&self, post_id: &str, likes: Vec<String>) -> Result<Document<Post>> {
        let posts = self.config().database.posts_collection.as_str();
        self.update_document(posts, post_id, &json!({ "likes": likes }))
            .await
    }

    /// Record that a profile saved a post. Nothing checks for an existing
    /// record first, so saving twice creates two.
    pub async fn save_post(&self, user_id: &str, post_id: &str) -> Result<Document<SavedPost>> {
        let saved = SavedPost {
            user: user_id.to_string(),
            post: post_id.to_string(),
        };
        let saves = self.config().database.saves_collection.as_str();
        self.create_document(saves, &saved).await
    }

    /// Remove a saved-post record by its own id.
    pub async fn delete_saved_post(&self, save_id: &str) -> Result<()> {
        let saves = self.config().database.saves_collection.as_str();
        self.delete_document(saves, save_id).await
    }

    pub async fn get_post(&self, post_id: &str) -> Result<Document<Post>> {
        let posts = self.config().database.posts_collection.as_str();
        self.get_document(posts, post_id).await
    }

    /// The home feed: newest posts first.
    pub async fn recent_posts(&self, limit: u32) -> Result<DocumentList<Post>> {
        let posts = self.config().database.posts_collection.as_str();
        self.list_documents(
            posts,
            &[Query::order_desc("$createdAt"), Query::limit(limit)],
        )
        .await
    }

    /// One page of the explore feed, ordered by last update. Pass the last
    /// id of the previous page to resume after it.
    pub async fn posts_page(
        &self,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<DocumentList<Post>> {
        let mut queries = vec![Query::order_desc("$updatedAt"), Query::limit(limit)];
        if let Some(cursor) = cursor {
            queries.push(Query::cursor_after(cursor));
        }
        let posts = self.config().database.posts_collection.as_str();
        self.list_documents(posts, &queries).await
    }

    /// Full-text search over captions. Order is backend relevance.
    pub async fn search_posts(&self, term: &str) -> Result<DocumentList<Post>> {
        let posts = self.config().database.posts_collection.as_str();
        self.search_documents(posts, "caption", term).await
    }

    /// Everything one profile has posted, newest first.
    pub async fn user_posts(&self, user_id: &str) -> Result<DocumentList<Post>> {
        let posts = self.config().database.posts_collection.as_str();
        self.list_documents(
            posts,
            &[
                Query::equal("creator", user_id),
                Query::order_desc("$createdAt"),
            ],
        )
        .await
    }
}

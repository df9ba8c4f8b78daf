use serde_json::json;

use crate::client::Client;
use crate::db::Query;
use crate::error::{Error, Result};
use crate::models::{Document, DocumentList, UserProfile};
use crate::storage::{ImageUpload, PreviewOptions};

/// Input for registration. `validate` carries the form-level rules; callers
/// collecting user input run it before submitting. The backend enforces its
/// own constraints (unique email and so on) regardless.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

impl NewUser {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().chars().count() < 2 {
            return Err(Error::Validation(
                "name must be at least 2 characters".into(),
            ));
        }
        if self.username.trim().chars().count() < 2 {
            return Err(Error::Validation(
                "username must be at least 2 characters".into(),
            ));
        }
        if !looks_like_email(&self.email) {
            return Err(Error::Validation(format!(
                "'{}' is not an email address",
                self.email
            )));
        }
        if self.password.chars().count() < 8 {
            return Err(Error::Validation(
                "password must be at least 8 characters".into(),
            ));
        }
        Ok(())
    }
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}

/// Changes to apply to a profile. A `None` bio clears the stored one.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub name: String,
    pub bio: Option<String>,
    pub image: Option<ImageUpload>,
}

impl Client {
    /// Register: create the account, then the profile document keyed by the
    /// new account id, with an initials avatar as the starting image.
    ///
    /// Accounts cannot be deleted from this side, so a profile-write failure
    /// leaves the account behind; the error names the failed step and the
    /// orphan is logged.
    pub async fn sign_up(&self, new_user: &NewUser) -> Result<Document<UserProfile>> {
        const WORKFLOW: &str = "sign_up";
        let account = self
            .create_account(&new_user.email, &new_user.password, &new_user.name)
            .await
            .map_err(|e| Error::workflow(WORKFLOW, "account", e))?;

        let avatar = self
            .initials_avatar_url(&account.name)
            .map_err(|e| Error::workflow(WORKFLOW, "avatar", e))?;

        let profile = UserProfile {
            account_id: account.id.clone(),
            name: account.name.clone(),
            username: new_user.username.clone(),
            email: account.email.clone(),
            image_url: avatar.to_string(),
            image_id: None,
            bio: None,
        };
        let users = self.config().database.users_collection.as_str();
        match self.create_document(users, &profile).await {
            Ok(doc) => Ok(doc),
            Err(e) => {
                tracing::warn!(
                    "account {} was created but its profile was not",
                    account.id
                );
                Err(Error::workflow(WORKFLOW, "profile", e))
            }
        }
    }

    /// The profile behind the active session, or `None` when nobody is
    /// signed in. Absence is not a failure: no session, a session the
    /// backend no longer accepts, and a missing profile document all come
    /// back as `Ok(None)`.
    pub async fn get_current_user(&self) -> Result<Option<Document<UserProfile>>> {
        if !self.has_session().await {
            return Ok(None);
        }
        let account = match self.current_account().await {
            Ok(account) => account,
            Err(Error::Auth(msg)) => {
                tracing::debug!("session rejected by the backend: {}", msg);
                return Ok(None);
            }
            Err(other) => return Err(other),
        };

        let users = self.config().database.users_collection.as_str();
        let matches: DocumentList<UserProfile> = self
            .list_documents(users, &[Query::equal("accountId", account.id.as_str())])
            .await?;
        Ok(matches.documents.into_iter().next())
    }

    /// Update a profile, optionally replacing its image. The new image is
    /// uploaded before the document is touched; the old one is deleted only
    /// after the update has committed.
    pub async fn update_profile(
        &self,
        profile_id: &str,
        update: ProfileUpdate,
    ) -> Result<Document<UserProfile>> {
        const WORKFLOW: &str = "update_profile";
        if profile_id.is_empty() {
            return Err(Error::Validation("a profile id is required".into()));
        }

        let users = self.config().database.users_collection.as_str();
        let current: Document<UserProfile> = self
            .get_document(users, profile_id)
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
            Some((id, url)) => (Some(id.clone()), url.to_string()),
            None => (current.data.image_id.clone(), current.data.image_url.clone()),
        };
        let payload = json!({
            "name": update.name,
            "bio": update.bio,
            "imageUrl": image_url,
            "imageId": image_id,
        });

        let updated = match self.update_document(users, profile_id, &payload).await {
            Ok(doc) => doc,
            Err(e) => {
                if let Some((id, _)) = &new_image {
                    self.discard_blob(id, WORKFLOW).await;
                }
                return Err(Error::workflow(WORKFLOW, "document", e));
            }
        };

        // The previous image is superseded only once the new state is
        // durable. A failure here is a leak, not a failed update.
        if new_image.is_some() {
            if let Some(old_id) = &current.data.image_id {
                if let Err(err) = self.delete_file(old_id).await {
                    tracing::warn!(
                        "profile {} updated but its old image {} was not deleted: {}",
                        profile_id,
                        old_id,
                        err
                    );
                }
            }
        }
        Ok(updated)
    }

    /// Profiles for the people list, newest first.
    pub async fn get_users(&self, limit: u32) -> Result<DocumentList<UserProfile>> {
        let users = self.config().database.users_collection.as_str();
        self.list_documents(
            users,
            &[Query::order_desc("$createdAt"), Query::limit(limit)],
        )
        .await
    }

    pub async fn get_user_by_id(&self, profile_id: &str) -> Result<Document<UserProfile>> {
        let users = self.config().database.users_collection.as_str();
        self.get_document(users, profile_id).await
    }
}

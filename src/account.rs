use serde_json::json;

use crate::client::{Client, Scope, UNIQUE_ID};
use crate::error::{Error, Result};
use crate::models::{Account, Session};

impl Client {
    /// Register a new account. The returned id is the immutable key the
    /// profile document is created against.
    pub async fn create_account(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Account> {
        let body = json!({
            "userId": UNIQUE_ID,
            "email": email,
            "password": password,
            "name": name,
        });
        let rb = self.post("account")?.json(&body);
        self.send_json(rb, Scope::Identity).await
    }

    /// Start an email+password session. On success the session secret is
    /// kept on the client and attached to later calls; on failure nothing
    /// is stored.
    pub async fn create_email_session(&self, email: &str, password: &str) -> Result<Session> {
        let body = json!({ "email": email, "password": password });
        let rb = self.post("account/sessions/email")?.json(&body);
        let session: Session = self.send_json(rb, Scope::Identity).await?;
        self.set_session(session.secret.clone()).await;
        Ok(session)
    }

    /// The account behind the current session. `Auth` when no session is
    /// attached or the backend no longer accepts it.
    pub async fn current_account(&self) -> Result<Account> {
        if !self.has_session().await {
            return Err(Error::Auth("no active session".into()));
        }
        let rb = self.get("account")?;
        self.send_json(rb, Scope::Identity).await
    }

    /// End the current session. Idempotent: signing out with no live
    /// session is a debug-logged no-op. The locally held secret is dropped
    /// once the session is known to be gone; a failing backend keeps it so
    /// the sign-out can be retried.
    pub async fn delete_current_session(&self) -> Result<()> {
        if !self.has_session().await {
            tracing::debug!("sign-out requested with no active session");
            return Ok(());
        }
        let rb = self.delete("account/sessions/current")?;
        match self.send_no_content(rb, Scope::Identity).await {
            Ok(()) => {
                self.clear_session().await;
                Ok(())
            }
            Err(Error::Auth(msg)) | Err(Error::NotFound(msg)) => {
                tracing::debug!("session already gone on the backend: {}", msg);
                self.clear_session().await;
                Ok(())
            }
            Err(other) => Err(other),
        }
    }
}

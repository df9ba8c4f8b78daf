use url::Url;

use crate::client::Client;
use crate::error::{Error, Result};

impl Client {
    /// Derive the URL of a generated initials avatar for a display name.
    /// New profiles use this as their image until the user uploads one.
    /// Pure computation, like preview URLs.
    pub fn initials_avatar_url(&self, name: &str) -> Result<Url> {
        if name.trim().is_empty() {
            return Err(Error::Validation(
                "avatar name must not be empty".into(),
            ));
        }
        let mut url = self.url("avatars/initials")?;
        url.query_pairs_mut()
            .append_pair("name", name)
            .append_pair("project", &self.config().backend.project_id);
        Ok(url)
    }
}

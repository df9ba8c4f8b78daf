use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use url::Url;

use crate::client::{Client, Scope, UNIQUE_ID};
use crate::error::{Error, Result};
use crate::models::FileRef;

/// Where a preview crop anchors when the requested aspect differs from the
/// source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CropAnchor {
    Center,
    #[default]
    Top,
    TopLeft,
    TopRight,
    Left,
    Right,
    Bottom,
    BottomLeft,
    BottomRight,
}

impl CropAnchor {
    pub fn as_str(&self) -> &'static str {
        match self {
            CropAnchor::Center => "center",
            CropAnchor::Top => "top",
            CropAnchor::TopLeft => "top-left",
            CropAnchor::TopRight => "top-right",
            CropAnchor::Left => "left",
            CropAnchor::Right => "right",
            CropAnchor::Bottom => "bottom",
            CropAnchor::BottomLeft => "bottom-left",
            CropAnchor::BottomRight => "bottom-right",
        }
    }
}

impl std::str::FromStr for CropAnchor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let anchor = match s {
            "center" => CropAnchor::Center,
            "top" => CropAnchor::Top,
            "top-left" => CropAnchor::TopLeft,
            "top-right" => CropAnchor::TopRight,
            "left" => CropAnchor::Left,
            "right" => CropAnchor::Right,
            "bottom" => CropAnchor::Bottom,
            "bottom-left" => CropAnchor::BottomLeft,
            "bottom-right" => CropAnchor::BottomRight,
            other => {
                return Err(Error::Validation(format!(
                    "unknown crop anchor '{other}'"
                )))
            }
        };
        Ok(anchor)
    }
}

/// A file handed to an upload step. The original name drives content-type
/// detection, so keep its extension.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Bytes,
}

/// Parameters for a derived preview URL.
#[derive(Debug, Clone)]
pub struct PreviewOptions {
    pub width: u32,
    pub height: u32,
    pub anchor: CropAnchor,
    pub quality: u8,
}

impl Default for PreviewOptions {
    /// The dimensions post images render at in the feed.
    fn default() -> Self {
        Self {
            width: 2000,
            height: 2000,
            anchor: CropAnchor::Top,
            quality: 100,
        }
    }
}

impl Client {
    /// Upload a blob. All-or-nothing: on failure no file exists on the
    /// backend and there is nothing to compensate.
    pub async fn upload_file(&self, file_name: &str, bytes: Bytes) -> Result<FileRef> {
        let mime = mime_guess::from_path(file_name).first_or_octet_stream();
        let part = Part::bytes(bytes.to_vec())
            .file_name(file_name.to_string())
            .mime_str(mime.as_ref())?;
        let form = Form::new().text("fileId", UNIQUE_ID).part("file", part);
        let rb = self.post(&self.files_path())?.multipart(form);
        self.send_json(rb, Scope::Storage).await
    }

    /// Derive the preview URL for a stored file. Pure computation: no
    /// request is made here, so an id unknown to the backend only surfaces
    /// when the URL is fetched.
    pub fn file_preview_url(&self, file_id: &str, options: &PreviewOptions) -> Result<Url> {
        if file_id.is_empty() {
            return Err(Error::Storage(
                "cannot derive a preview for an empty file id".into(),
            ));
        }
        let mut url = self.url(&format!("{}/{}/preview", self.files_path(), file_id))?;
        url.query_pairs_mut()
            .append_pair("width", &options.width.to_string())
            .append_pair("height", &options.height.to_string())
            .append_pair("gravity", options.anchor.as_str())
            .append_pair("quality", &options.quality.to_string())
            .append_pair("project", &self.config().backend.project_id);
        Ok(url)
    }

    /// Delete a blob. Tolerates "already deleted" so compensation paths
    /// can call it unconditionally.
    pub async fn delete_file(&self, file_id: &str) -> Result<()> {
        let path = format!("{}/{}", self.files_path(), file_id);
        let rb = self.delete(&path)?;
        match self.send_no_content(rb, Scope::Storage).await {
            Err(Error::NotFound(_)) => {
                tracing::debug!("file {} was already deleted", file_id);
                Ok(())
            }
            other => other,
        }
    }

    /// Best-effort cleanup of a blob a workflow no longer wants. The
    /// workflow's own error is what the caller sees; a failure here only
    /// gets logged.
    pub(crate) async fn discard_blob(&self, file_id: &str, workflow: &str) {
        if let Err(err) = self.delete_file(file_id).await {
            tracing::warn!(
                "leaked blob {} while unwinding {}: {}",
                file_id,
                workflow,
                err
            );
        }
    }

    fn files_path(&self) -> String {
        format!("storage/buckets/{}/files", self.config().storage.bucket_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn preview_url_carries_dimensions_and_project() {
        let client = test_client();
        let url = client
            .file_preview_url("b1", &PreviewOptions::default())
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://backend.example.com/v1/storage/buckets/media/files/b1/preview\
             ?width=2000&height=2000&gravity=top&quality=100&project=proj1"
        );
    }

    #[test]
    fn preview_url_respects_custom_options() {
        let client = test_client();
        let options = PreviewOptions {
            width: 400,
            height: 300,
            anchor: CropAnchor::Center,
            quality: 80,
        };
        let url = client.file_preview_url("b2", &options).unwrap();
        assert!(url.as_str().contains("width=400"));
        assert!(url.as_str().contains("height=300"));
        assert!(url.as_str().contains("gravity=center"));
        assert!(url.as_str().contains("quality=80"));
    }

    #[test]
    fn preview_url_rejects_empty_file_id() {
        let client = test_client();
        match client.file_preview_url("", &PreviewOptions::default()) {
            Err(Error::Storage(msg)) => assert!(msg.contains("empty")),
            other => panic!("expected storage error, got {other:?}"),
        }
    }

    #[test]
    fn crop_anchor_renders_wire_names() {
        assert_eq!(CropAnchor::Top.as_str(), "top");
        assert_eq!(CropAnchor::BottomRight.as_str(), "bottom-right");
        assert_eq!(CropAnchor::default(), CropAnchor::Top);
    }

    #[test]
    fn crop_anchor_parses_its_own_names() {
        for anchor in [
            CropAnchor::Center,
            CropAnchor::Top,
            CropAnchor::TopLeft,
            CropAnchor::TopRight,
            CropAnchor::Left,
            CropAnchor::Right,
            CropAnchor::Bottom,
            CropAnchor::BottomLeft,
            CropAnchor::BottomRight,
        ] {
            assert_eq!(anchor.as_str().parse::<CropAnchor>().unwrap(), anchor);
        }
        assert!("middle".parse::<CropAnchor>().is_err());
    }
}

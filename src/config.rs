use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;

use crate::storage::CropAnchor;

#[derive(Parser, Debug)]
#[command(name = "snapgram", about = "Client for the snapgram photo-sharing backend")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Backend endpoint URL
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Project identifier
    #[arg(long)]
    pub project: Option<String>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an account and its profile document
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Start a session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// End the current session
    Logout,
    /// Show the signed-in profile
    Whoami,
    /// Recent posts, newest first
    Feed {
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Browse all posts by last update, one page at a time
    Explore {
        #[arg(long, default_value_t = 9)]
        limit: u32,
        /// Resume after this post id
        #[arg(long)]
        cursor: Option<String>,
    },
    /// Full-text search over captions
    Search { term: String },
    /// Posts created by one user
    UserPosts { user: String },
    /// Upload an image and publish a post
    CreatePost {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        caption: String,
        #[arg(long)]
        location: Option<String>,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
    },
    /// Edit a post, optionally replacing its image
    UpdatePost {
        #[arg(long)]
        post: String,
        #[arg(long)]
        caption: String,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        tags: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Delete a post and its image
    DeletePost {
        #[arg(long)]
        post: String,
        #[arg(long)]
        image: String,
    },
    /// Derive the preview URL for a stored image
    Preview {
        file: String,
        #[arg(long, default_value_t = 2000)]
        width: u32,
        #[arg(long, default_value_t = 2000)]
        height: u32,
        /// Crop anchor (top, center, bottom-left, ...)
        #[arg(long, default_value = "top")]
        anchor: CropAnchor,
        #[arg(long, default_value_t = 100)]
        quality: u8,
    },
    /// Toggle a like on a post for the signed-in profile
    Like { post: String },
    /// Save a post for the signed-in profile
    Save { post: String },
    /// Remove a saved-post record
    Unsave { save: String },
    /// Update the signed-in profile
    UpdateProfile {
        #[arg(long)]
        name: String,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Show one profile
    Profile { user: String },
    /// List profiles, newest first
    Users {
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct BackendConfig {
    pub endpoint: String,
    pub project_id: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub id: String,
    pub users_collection: String,
    pub posts_collection: String,
    pub saves_collection: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub bucket_id: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://cloud.snapgram.io/v1".to_string(),
            project_id: String::new(),
        }
    }
}

impl Config {
    /// Load settings once at startup: config file, then `SNAPGRAM_*`
    /// environment variables, then CLI flags. Invalid or incomplete
    /// settings fail here rather than on the first request.
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        config.apply_env();

        // CLI overrides
        if let Some(ref endpoint) = cli.endpoint {
            config.backend.endpoint = endpoint.clone();
        }
        if let Some(ref project) = cli.project {
            config.backend.project_id = project.clone();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .expect("Could not determine home directory")
                .join(".snapgram")
        })
    }

    fn apply_env(&mut self) {
        let overrides: [(&str, &mut String); 7] = [
            ("SNAPGRAM_ENDPOINT", &mut self.backend.endpoint),
            ("SNAPGRAM_PROJECT_ID", &mut self.backend.project_id),
            ("SNAPGRAM_DATABASE_ID", &mut self.database.id),
            ("SNAPGRAM_USERS_COLLECTION", &mut self.database.users_collection),
            ("SNAPGRAM_POSTS_COLLECTION", &mut self.database.posts_collection),
            ("SNAPGRAM_SAVES_COLLECTION", &mut self.database.saves_collection),
            ("SNAPGRAM_BUCKET_ID", &mut self.storage.bucket_id),
        ];
        for (name, slot) in overrides {
            if let Ok(value) = std::env::var(name) {
                *slot = value;
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let endpoint = url::Url::parse(&self.backend.endpoint).map_err(|e| {
            anyhow::anyhow!("invalid endpoint '{}': {}", self.backend.endpoint, e)
        })?;
        if endpoint.scheme() != "http" && endpoint.scheme() != "https" {
            anyhow::bail!(
                "endpoint must be http or https, got '{}'",
                endpoint.scheme()
            );
        }

        let required: [(&str, &str); 6] = [
            ("backend.project_id", &self.backend.project_id),
            ("database.id", &self.database.id),
            ("database.users_collection", &self.database.users_collection),
            ("database.posts_collection", &self.database.posts_collection),
            ("database.saves_collection", &self.database.saves_collection),
            ("storage.bucket_id", &self.storage.bucket_id),
        ];
        for (name, value) in required {
            if value.is_empty() {
                anyhow::bail!("missing required setting '{}'", name);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn cli_with(data_dir: &std::path::Path) -> Cli {
        Cli {
            config: None,
            endpoint: None,
            project: None,
            data_dir: Some(data_dir.to_path_buf()),
            command: Command::Whoami,
        }
    }

    fn complete_toml() -> &'static str {
        r#"
[backend]
endpoint = "https://backend.example.com/v1"
project_id = "proj1"

[database]
id = "db1"
users_collection = "users"
posts_collection = "posts"
saves_collection = "saves"

[storage]
bucket_id = "media"
"#
    }

    fn clear_env() {
        for name in [
            "SNAPGRAM_ENDPOINT",
            "SNAPGRAM_PROJECT_ID",
            "SNAPGRAM_DATABASE_ID",
            "SNAPGRAM_USERS_COLLECTION",
            "SNAPGRAM_POSTS_COLLECTION",
            "SNAPGRAM_SAVES_COLLECTION",
            "SNAPGRAM_BUCKET_ID",
        ] {
            std::env::remove_var(name);
        }
    }

    #[test]
    fn default_config_points_at_hosted_endpoint() {
        let config = Config::default();
        assert_eq!(config.backend.endpoint, "https://cloud.snapgram.io/v1");
        assert!(config.backend.project_id.is_empty());
    }

    #[test]
    fn validate_rejects_missing_identifiers() {
        let err = Config::default().validate().unwrap_err();
        assert!(err.to_string().contains("project_id"));
    }

    #[test]
    fn validate_rejects_non_http_endpoint() {
        let mut config = Config::default();
        config.backend.endpoint = "ftp://backend.example.com".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("http"));
    }

    #[test]
    #[serial]
    fn load_reads_toml_file() {
        clear_env();
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(&config_path, complete_toml()).unwrap();

        let mut cli = cli_with(tmp.path());
        cli.config = Some(config_path);
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.backend.endpoint, "https://backend.example.com/v1");
        assert_eq!(config.database.users_collection, "users");
        assert_eq!(config.storage.bucket_id, "media");
    }

    #[test]
    #[serial]
    fn env_overrides_beat_toml_values() {
        clear_env();
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(&config_path, complete_toml()).unwrap();

        std::env::set_var("SNAPGRAM_PROJECT_ID", "proj-from-env");
        let mut cli = cli_with(tmp.path());
        cli.config = Some(config_path);
        let config = Config::load(&cli).unwrap();
        clear_env();

        assert_eq!(config.backend.project_id, "proj-from-env");
    }

    #[test]
    #[serial]
    fn cli_overrides_beat_env_and_toml() {
        clear_env();
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(&config_path, complete_toml()).unwrap();

        std::env::set_var("SNAPGRAM_ENDPOINT", "https://env.example.com/v1");
        let mut cli = cli_with(tmp.path());
        cli.config = Some(config_path);
        cli.endpoint = Some("https://flag.example.com/v1".into());
        let config = Config::load(&cli).unwrap();
        clear_env();

        assert_eq!(config.backend.endpoint, "https://flag.example.com/v1");
    }

    #[test]
    #[serial]
    fn load_fails_fast_when_config_is_incomplete() {
        clear_env();
        let tmp = tempfile::tempdir().unwrap();
        let cli = cli_with(tmp.path());
        let err = Config::load(&cli).unwrap_err();
        assert!(err.to_string().contains("missing required setting"));
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let cli = cli_with(std::path::Path::new("/tmp/snapgram-test"));
        assert_eq!(
            Config::data_dir(&cli),
            PathBuf::from("/tmp/snapgram-test")
        );
    }
}

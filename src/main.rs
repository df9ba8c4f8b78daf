mod account;
mod avatars;
mod client;
mod config;
mod db;
mod error;
mod models;
mod posts;
mod storage;
mod users;

use std::path::{Path, PathBuf};

use anyhow::Context;
use bytes::Bytes;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::client::Client;
use crate::config::{Cli, Command, Config};
use crate::models::{Document, UserProfile};
use crate::posts::{NewPost, PostUpdate};
use crate::storage::{ImageUpload, PreviewOptions};
use crate::users::{NewUser, ProfileUpdate};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;

    let config = Config::load(&cli)?;
    let client = Client::new(config)?;

    // Adopt the session from a previous run, if any
    let session_file = session_path(&data_dir);
    if let Some(secret) = read_session(&session_file) {
        client.set_session(secret).await;
    }

    match cli.command {
        Command::Signup {
            name,
            username,
            email,
            password,
        } => {
            let user = NewUser {
                name,
                username,
                email,
                password,
            };
            user.validate()?;
            let profile = client.sign_up(&user).await?;
            tracing::info!("registered profile {}", profile.id);
            print_json(&profile)?;
        }
        Command::Login { email, password } => {
            let session = client.create_email_session(&email, &password).await?;
            // Keep the secret the client now holds for the next invocation.
            if let Some(secret) = client.session_secret().await {
                write_session(&session_file, &secret).with_context(|| {
                    format!("could not persist session to {}", session_file.display())
                })?;
            }
            tracing::info!(
                "signed in as account {}; session expires {}",
                session.user_id,
                session.expire
            );
        }
        Command::Logout => {
            client.delete_current_session().await?;
            if let Err(err) = std::fs::remove_file(&session_file) {
                if err.kind() != std::io::ErrorKind::NotFound {
                    return Err(err.into());
                }
            }
            tracing::info!("signed out");
        }
        Command::Whoami => {
            let me = client.get_current_user().await?;
            print_json(&me)?;
        }
        Command::Feed { limit } => {
            let page = client.recent_posts(limit).await?;
            print_json(&page)?;
        }
        Command::Explore { limit, cursor } => {
            let page = client.posts_page(limit, cursor.as_deref()).await?;
            print_json(&page)?;
        }
        Command::Search { term } => {
            let found = client.search_posts(&term).await?;
            print_json(&found)?;
        }
        Command::UserPosts { user } => {
            let page = client.user_posts(&user).await?;
            print_json(&page)?;
        }
        Command::CreatePost {
            file,
            caption,
            location,
            tags,
        } => {
            let me = require_profile(&client).await?;
            let post = client
                .create_post(NewPost {
                    creator: me.id,
                    caption,
                    location,
                    tags,
                    image: read_image(&file)?,
                })
                .await?;
            tracing::info!("published post {}", post.id);
            print_json(&post)?;
        }
        Command::UpdatePost {
            post,
            caption,
            location,
            tags,
            file,
        } => {
            let image = file.as_deref().map(read_image).transpose()?;
            let updated = client
                .update_post(
                    &post,
                    PostUpdate {
                        caption,
                        location,
                        tags,
                        image,
                    },
                )
                .await?;
            print_json(&updated)?;
        }
        Command::DeletePost { post, image } => {
            client.delete_post(&post, &image).await?;
            tracing::info!("deleted post {}", post);
        }
        Command::Preview {
            file,
            width,
            height,
            anchor,
            quality,
        } => {
            let url = client.file_preview_url(
                &file,
                &PreviewOptions {
                    width,
                    height,
                    anchor,
                    quality,
                },
            )?;
            println!("{url}");
        }
        Command::Like { post } => {
            let me = require_profile(&client).await?;
            let current = client.get_post(&post).await?;
            let mut likes = current.data.likes;
            match likes.iter().position(|id| id == &me.id) {
                Some(at) => {
                    likes.remove(at);
                }
                None => likes.push(me.id),
            }
            let updated = client.like_post(&post, likes).await?;
            print_json(&updated)?;
        }
        Command::Save { post } => {
            let me = require_profile(&client).await?;
            let saved = client.save_post(&me.id, &post).await?;
            print_json(&saved)?;
        }
        Command::Unsave { save } => {
            client.delete_saved_post(&save).await?;
            tracing::info!("removed saved post {}", save);
        }
        Command::UpdateProfile { name, bio, file } => {
            let me = require_profile(&client).await?;
            let image = file.as_deref().map(read_image).transpose()?;
            let updated = client
                .update_profile(&me.id, ProfileUpdate { name, bio, image })
                .await?;
            print_json(&updated)?;
        }
        Command::Profile { user } => {
            let profile = client.get_user_by_id(&user).await?;
            print_json(&profile)?;
        }
        Command::Users { limit } => {
            let users = client.get_users(limit).await?;
            print_json(&users)?;
        }
    }

    Ok(())
}

fn session_path(data_dir: &Path) -> PathBuf {
    data_dir.join("session")
}

fn read_session(path: &Path) -> Option<String> {
    std::fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn write_session(path: &Path, secret: &str) -> std::io::Result<()> {
    std::fs::write(path, secret)?;

    // Restrict the session secret to its owner on Unix
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

/// The signed-in profile, or an error telling the user to sign in.
async fn require_profile(client: &Client) -> anyhow::Result<Document<UserProfile>> {
    client
        .get_current_user()
        .await?
        .ok_or_else(|| anyhow::anyhow!("not signed in; run `snapgram login` first"))
}

fn read_image(path: &Path) -> anyhow::Result<ImageUpload> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow::anyhow!("'{}' has no file name", path.display()))?;
    let bytes = std::fs::read(path)
        .with_context(|| format!("could not read image '{}'", path.display()))?;
    Ok(ImageUpload {
        file_name,
        bytes: Bytes::from(bytes),
    })
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

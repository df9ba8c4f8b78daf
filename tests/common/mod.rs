use snapgram::client::Client;
use snapgram::config::Config;
use wiremock::MockServer;

/// The identifiers every test talks to the mock backend with.
pub fn test_config(endpoint: &str) -> Config {
    let mut config = Config::default();
    config.backend.endpoint = endpoint.to_string();
    config.backend.project_id = "proj1".into();
    config.database.id = "db1".into();
    config.database.users_collection = "users".into();
    config.database.posts_collection = "posts".into();
    config.database.saves_collection = "saves".into();
    config.storage.bucket_id = "media".into();
    config
}

/// A client wired to a mock backend.
pub fn client_against(server: &MockServer) -> Client {
    Client::new(test_config(&server.uri())).expect("client should build against the mock server")
}

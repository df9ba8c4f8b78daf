// Library exports for Snapgram
// This allows integration tests and external code to use the client modules

pub mod account;
pub mod avatars;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod posts;
pub mod storage;
pub mod users;

//! Integration tests with a mock runtime

pub mod generate;
pub mod mock_server;
pub mod static_assets;

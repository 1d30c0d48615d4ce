use super::RequestsLoggingLevel;

#[derive(Clone)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    /// HS256 secret the identity service signs session tokens with.
    pub jwt_secret: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 4000,
            jwt_secret: "insecure-dev-secret".to_string(),
        }
    }
}

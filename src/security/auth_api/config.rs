#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub allow_anonymous_paths: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            allow_anonymous_paths: vec![
                "/health".to_string(),
                "/api/v1/auth/login".to_string(),
                "/api/v1/auth/register".to_string(),
            ],
        }
    }
}

impl AuthConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_anonymous_path(mut self, path: impl Into<String>) -> Self {
        self.allow_anonymous_paths.push(path.into());
        self
    }

    pub fn is_anonymous_allowed(&self, path: &str) -> bool {
        self.allow_anonymous_paths
            .iter()
            .any(|allowed| path == allowed || path.starts_with(&format!("{}/", allowed)))
    }
}

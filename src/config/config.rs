use serde::Deserialize;

use crate::store::models::{User, UserSettings};

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// DuckDB file path, or `:memory:` for a throwaway store.
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: "docchat.duckdb".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key: "${GEMINI_API_KEY}".to_string(),
            model: "gemini-2.5-flash".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: "${OPENAI_API_KEY}".to_string(),
            model: "gpt-4o-mini".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub gemini: GeminiConfig,
    pub openai: OpenAiConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            gemini: GeminiConfig::default(),
            openai: OpenAiConfig::default(),
        }
    }
}

/// Initial values for [`UserSettings`] when none were persisted yet.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChatConfig {
    pub context_history_limit: u32,
    pub use_project_knowledge: bool,
    pub use_user_knowledge: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            context_history_limit: 6,
            use_project_knowledge: true,
            use_user_knowledge: true,
        }
    }
}

impl ChatConfig {
    pub fn settings(&self) -> UserSettings {
        UserSettings {
            context_history_limit: self.context_history_limit,
            use_project_knowledge: self.use_project_knowledge,
            use_user_knowledge: self.use_user_knowledge,
        }
        .clamped()
    }
}

/// Profile handed out by the simulated login.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct UserConfig {
    pub id: String,
    pub email: String,
    pub name: String,
    pub avatar_url: String,
    pub is_admin: bool,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            id: "u1".to_string(),
            email: "alex.dev@example.com".to_string(),
            name: "Alex Developer".to_string(),
            avatar_url: "https://picsum.photos/200".to_string(),
            is_admin: true,
        }
    }
}

impl UserConfig {
    pub fn user(&self) -> User {
        User {
            id: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            avatar_url: self.avatar_url.clone(),
            is_admin: self.is_admin,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub llm: LlmConfig,
    pub chat: ChatConfig,
    pub user: UserConfig,
}

impl AppConfig {
    pub fn load(path: &str) -> Result<Self, ::config::ConfigError> {
        dotenv::dotenv().ok();

        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name(path).required(false))
            .add_source(::config::Environment::with_prefix("DOCCHAT").separator("__"))
            .build()?;

        let mut app_config: AppConfig = settings.try_deserialize()?;

        // Expand environment variables if present like ${GEMINI_API_KEY}
        app_config.server.host = expand_env(&app_config.server.host);
        app_config.storage.path = expand_env(&app_config.storage.path);
        app_config.llm.gemini.api_key = expand_env(&app_config.llm.gemini.api_key);
        app_config.llm.openai.api_key = expand_env(&app_config.llm.openai.api_key);

        Ok(app_config)
    }
}

fn expand_env(val: &str) -> String {
    match val.strip_prefix("${").and_then(|v| v.strip_suffix('}')) {
        Some(var_name) => std::env::var(var_name).unwrap_or_default(),
        None => val.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_braced_variables_only() {
        std::env::set_var("DOCCHAT_TEST_EXPAND", "secret");
        assert_eq!(expand_env("${DOCCHAT_TEST_EXPAND}"), "secret");
        assert_eq!(expand_env("${DOCCHAT_TEST_UNSET_VAR}"), "");
        assert_eq!(expand_env("plain"), "plain");
    }

    #[test]
    fn defaults_cover_every_section() {
        let config = AppConfig::default();
        assert_eq!(config.llm.provider, "gemini");
        assert_eq!(config.chat.settings().context_history_limit, 6);
        assert!(config.user.user().is_admin);
    }
}

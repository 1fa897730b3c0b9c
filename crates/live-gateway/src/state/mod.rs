//! Application state
//!
//! Shared by every handler: the chat core, token validation and the
//! loaded configuration.

use std::sync::Arc;

use live_common::{AppConfig, ChatConfig, JwtService};
use live_service::ChatService;

#[derive(Clone)]
pub struct AppState {
    chat: Arc<ChatService>,
    jwt: Arc<JwtService>,
    config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(chat: ChatService, jwt: JwtService, config: AppConfig) -> Self {
        Self {
            chat: Arc::new(chat),
            jwt: Arc::new(jwt),
            config: Arc::new(config),
        }
    }

    pub fn chat(&self) -> &ChatService {
        &self.chat
    }

    pub fn jwt_service(&self) -> &JwtService {
        &self.jwt
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn chat_config(&self) -> &ChatConfig {
        &self.config.chat
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("chat", &self.chat)
            .field("config", &"AppConfig")
            .finish()
    }
}

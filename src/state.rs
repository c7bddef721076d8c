use std::sync::Arc;

use crate::{
    config::Config,
    services::{
        assistant::AssistantService, identity::IdentityStore, message_router::MessageRouter,
        session_guard::SessionGuard, token_service::TokenService,
    },
    websocket::ConnectionRegistry,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub tokens: Arc<TokenService>,
    pub identity: Arc<dyn IdentityStore>,
    pub guard: Arc<SessionGuard>,
    pub router: Arc<MessageRouter>,
    pub assistant: Arc<AssistantService>,
    pub registry: ConnectionRegistry,
}

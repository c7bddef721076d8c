pub mod assistant;
pub mod conversation;
pub mod identity;
pub mod message_router;
pub mod moderation;
pub mod session_guard;
pub mod token_service;

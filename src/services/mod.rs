mod auth_service;
mod task_factory;
mod task_service;

pub use auth_service::{AuthService, Claims, TokenKind};
pub use task_service::TaskService;

mod user;
mod forms;
mod task;

pub use user::{User, UserProfile};
pub use forms::{
    ChangePasswordRequest, CreateTaskRequest, LoginRequest, LoginResponse, LogoutRequest,
    RegisterRequest, TokenPair, UpdateTaskRequest,
};
pub use task::{Category, Priority, Task, TaskStatus};

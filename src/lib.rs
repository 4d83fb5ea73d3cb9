pub mod bootstrap;
pub mod config;
mod context;
mod error;
mod handlers;
pub mod identity;
pub mod request;
pub mod response;
pub mod store;

pub use context::AppContext;
pub use error::AppError;
pub use handlers::{
    delete_account, handle_request, ACCOUNT_DELETED_MESSAGE, USER_NOT_FOUND_MESSAGE,
};

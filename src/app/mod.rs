pub mod auth;
pub mod comments;
pub mod notifications;
pub mod ownership;
pub mod pagination;
pub mod posts;
pub mod slug;
pub mod users;

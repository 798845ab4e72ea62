pub mod admin_ops;
pub mod health;

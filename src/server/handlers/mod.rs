pub mod health;
pub mod recommend;
pub mod sessions;

pub mod auth;
pub mod fields;
pub mod health;
pub mod properties;
pub mod views;

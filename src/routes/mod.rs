pub mod access;
pub mod health;
pub mod records;
pub mod view_mode;

pub mod error;
pub mod principal;
pub mod repository;

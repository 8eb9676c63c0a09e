pub mod application;
pub mod config;
pub mod data;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

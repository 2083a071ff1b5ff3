pub mod app;
pub mod catalog;
pub mod config;
pub mod favorites;
pub mod models;
pub mod omdb;
pub mod pagination;
pub mod session;
pub mod storage;

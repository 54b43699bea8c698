pub mod db;
pub mod local;
pub mod markdown;
pub mod models;
pub mod rating;
pub mod recipe_csv;
pub mod service;
pub mod store;

pub mod api;
pub mod config;
pub mod content;
pub mod db;
pub mod editor;
pub mod i18n;
pub mod pipeline;
pub mod providers;
pub mod security;
pub mod server;
pub mod templates;
pub mod translation;

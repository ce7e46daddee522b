pub mod api;
pub mod app;
pub mod capture;
pub mod cli;
pub mod config;
pub mod controls;
pub mod conversion;
pub mod global;
pub mod history;
pub mod i18n;
pub mod prefs;
pub mod session;

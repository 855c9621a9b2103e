pub mod app;
pub mod archive;
pub mod bucket;
pub mod catalog;
pub mod config;
pub mod diagnostics;
pub mod discovery;
pub mod domain;
pub mod error;
pub mod export;
pub mod fs_util;
pub mod import;
pub mod output;
pub mod session;

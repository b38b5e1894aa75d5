pub mod cache;
pub mod cli;
pub mod commands;
pub mod error;
pub mod fuzzy;
pub mod google;
pub mod models;
pub mod owners;
pub mod route;
pub mod runlog;
pub mod scrape;
pub mod sheet;
pub mod util;

pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::{Cli, Command, ReviewAction};
pub use config::file::BoardConfig;

pub use adapters::{BoardRepository, LocalStorage, MemoryStorage};
pub use app::{ClaimService, Exporter, LevelCatalog, ReviewService};
pub use core::engine::RankEngine;
pub use utils::error::{BoardError, Result};

// Application services: the workflows external callers (CLI, web layer)
// drive. Rank and flag mutations always go through the engine; services add
// the record-keeping around them.

pub mod catalog;
pub mod claims;
pub mod export;
pub mod leaderboard;
pub mod review;

pub use catalog::LevelCatalog;
pub use claims::ClaimService;
pub use export::Exporter;
pub use review::ReviewService;

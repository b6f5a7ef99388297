pub mod alias;
pub mod assembler;
pub mod block_strategy;
pub mod config;
pub mod context;
pub mod error;
pub mod fetch;
pub mod fixture_scraper;
pub mod json_strategy;
pub mod score_reconciler;
pub mod store;
pub mod strategy;
pub mod table_strategy;
pub mod text_strategy;
pub mod types;
pub mod utils;

pub use config::ScraperConfig;
pub use fixture_scraper::{FixtureScraper, ScrapeOutcome, SourceFormat};
pub use types::{Match, MatchStatus, Score, Venue};

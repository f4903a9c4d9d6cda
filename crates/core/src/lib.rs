pub mod config;
pub mod error;
pub mod linker;
pub mod listing;
pub mod types;

pub use config::{load_site_config, parse_site_config_str};
pub use error::{Error, Result};
pub use linker::{LinkChange, LinkOutcome, link_og_images};
pub use listing::{Listing, ListingIssue, extract_posts};
pub use types::*;

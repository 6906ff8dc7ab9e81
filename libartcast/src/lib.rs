//! Artcast - post one submission to many gallery websites
//!
//! This library drives a single logical submission (a file plus tags,
//! rating, description, and sources) through per-site validation and a
//! cookie-authenticated posting pipeline, one adapter per destination.

pub mod accounts;
pub mod config;
pub mod description;
pub mod error;
pub mod files;
pub mod logging;
pub mod poster;
pub mod tags;
pub mod transport;
pub mod types;
pub mod websites;

// Re-export commonly used types
pub use accounts::{AccountId, Cookie, CookieStore};
pub use config::Config;
pub use error::{ArtcastError, Result, WebsiteError};
pub use poster::{PostTarget, Poster};
pub use transport::SessionTransport;
pub use types::{PostResult, Rating, Submission, SubmissionFile, ValidationReport};
pub use websites::{default_registry, Website, WebsiteRegistry};

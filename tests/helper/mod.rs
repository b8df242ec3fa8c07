pub mod fetcher;

pub use fetcher::{ScriptedFetcher, repo};

//! feedmux merges YouTube channel feeds and standard RSS feeds into a
//! single Media RSS document.
//!
//! The pipeline is a single batch per run:
//!
//! 1. Each configured source is fetched and its raw entries are normalized
//!    into the canonical [`feed::Entry`] shape ([`feed::fetcher`],
//!    [`feed::normalize`]). A source that fails contributes zero entries and
//!    never aborts the run.
//! 2. The per-source lists are merged newest-first with a deterministic
//!    tie-break and capped ([`feed::aggregate`]).
//! 3. The result is rendered as an RSS 2.0 document carrying the Media RSS,
//!    YouTube, Dublin Core, and Atom extension namespaces ([`mrss`]).

pub mod config;
pub mod feed;
pub mod mrss;
pub mod util;

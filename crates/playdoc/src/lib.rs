//! Interactive code playgrounds for markdown documentation.
//!
//! Pages are rendered with [`playmark`], which turns fenced samples into
//! placeholders. [`Page::hydrate`] then mounts a live editor per placeholder,
//! and runnable ones execute through [`playdoc_runtime`].

pub mod config;
mod snippet;

pub use config::{ResolvedConfig, global_config, load_config, set_global_config};
pub use snippet::{HydrationContext, Page, Snippet};

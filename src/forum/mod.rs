//! Forum data model: scraped posts and the read-only reply graph.

pub mod graph;
pub mod post;

pub use graph::PostGraph;
pub use post::{Post, load_posts};

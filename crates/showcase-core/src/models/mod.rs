//! Data models for the Showcase data layer.

mod favorite;
mod repository;

pub use favorite::*;
pub use repository::*;

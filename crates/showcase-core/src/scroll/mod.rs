//! Continuous auto-scroll that yields to hover and manual drag.

mod driver;
mod engine;

pub use driver::{ScrollController, ScrollDriver, ScrollHandle, ScrollSurface};
pub use engine::{PointerTarget, ScrollEngine, ScrollMode};

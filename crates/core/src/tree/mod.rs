#![forbid(unsafe_code)]

mod bounds;
mod placement;
mod plan;
mod rebuild;

pub use bounds::*;
pub use placement::*;
pub use plan::*;
pub use rebuild::*;

pub mod board;
pub mod community;
pub mod enums;
pub mod identity;
pub mod library;
pub mod macros;
pub mod planner;

pub use board::*;
pub use community::*;
pub use enums::*;
pub use identity::*;
pub use library::*;
pub use planner::*;

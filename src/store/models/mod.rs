pub mod result;
pub mod visit;

pub use result::{Assets, FinalizedResult, Metrics};
pub use visit::{NewVisit, Visit};

pub mod fitter;
pub mod obj;

pub use fitter::{FitOutcome, MeshFit, MeshFitter, SmplParams};

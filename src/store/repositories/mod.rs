pub mod results;
pub mod visits;

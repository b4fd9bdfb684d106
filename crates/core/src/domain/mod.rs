pub mod period;
pub mod profile;
pub mod recommendation;
pub mod universe;

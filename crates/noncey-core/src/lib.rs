pub mod counter;
pub mod engine;
pub mod errors;
pub mod ids;
pub mod model;
pub mod resolve;

pub use counter::*;
pub use engine::*;
pub use errors::*;
pub use ids::*;
pub use model::*;
pub use resolve::*;

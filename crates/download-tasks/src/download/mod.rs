mod traits;
pub use traits::*;

mod types;
pub use types::*;

mod tracker;
pub use tracker::*;

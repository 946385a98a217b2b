pub mod cache;
pub mod lifecycle;
pub mod lookup;
pub mod transition;
pub mod visit;

pub use cache::*;
pub use lifecycle::*;
pub use lookup::*;
pub use transition::*;
pub use visit::*;

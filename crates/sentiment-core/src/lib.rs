pub mod components;
pub mod documents;
pub mod error;
pub mod stats;
pub mod traits;
pub mod types;

pub use components::*;
pub use documents::*;
pub use error::*;
pub use traits::*;
pub use types::*;

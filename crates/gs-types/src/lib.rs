pub mod errors;
pub mod format;
pub mod value;

pub use errors::*;
pub use format::*;
pub use value::*;

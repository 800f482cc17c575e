pub mod envelope;
pub mod errors;
pub mod record;

pub use envelope::*;
pub use errors::*;
pub use record::*;

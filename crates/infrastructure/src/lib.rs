pub mod batch_writer;
pub mod dynamodb;
pub mod models;
pub mod store;

pub use batch_writer::*;
pub use dynamodb::*;
pub use models::*;
pub use store::*;

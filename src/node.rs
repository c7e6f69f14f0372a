pub mod drain;
pub mod hostname;

pub use drain::NodeDrainer;

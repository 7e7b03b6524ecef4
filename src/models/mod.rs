pub mod advisory;
pub mod profile;

pub use advisory::*;
pub use profile::*;

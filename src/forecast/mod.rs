pub mod profile;
pub mod provider;

pub use profile::*;
pub use provider::*;

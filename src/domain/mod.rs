pub mod feeder;
pub mod forecast;
pub mod grid;

pub use feeder::*;
pub use forecast::*;
pub use grid::*;

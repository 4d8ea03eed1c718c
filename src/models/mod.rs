pub mod inventory;
pub mod order;

pub use inventory::*;
pub use order::*;

pub mod commands;
pub mod device;
pub mod events;
pub mod topics;

pub use commands::*;
pub use device::*;
pub use events::*;

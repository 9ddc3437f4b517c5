pub mod shutdown;
pub mod types;

pub use shutdown::{ShutdownCoordinator, ShutdownSignal};
pub use types::*;

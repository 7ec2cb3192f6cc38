pub mod diagnostics;
pub mod health;
pub mod session;

pub use diagnostics::*;
pub use health::*;
pub use session::*;

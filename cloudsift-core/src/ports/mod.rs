//! Collaborator ports. Cloud SDK adapters implement these; the core never
//! talks to a provider API directly.

pub mod scanner;
pub mod session;

pub use scanner::{ScanOptions, Scanner};
pub use session::SessionProvider;

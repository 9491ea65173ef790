pub mod guard;

pub use guard::{AlreadyHeld, GuardToken, KeyedGuard};

pub mod holds;
pub mod payments;
pub mod reaper;
pub mod sessions;

pub use holds::{CreateHold, HoldManager, HoldPolicy, HoldReceipt};
pub use payments::{PaymentFinalizer, ProcessPayment};
pub use reaper::ExpiryReaper;
pub use sessions::{SessionManager, StartSession};

//! Backend gateway: the typed REST boundary to the copy-trading service.

mod gateway;
mod types;

pub use gateway::{BackendGateway, HttpGateway};
pub use types::{CreatedAccount, VerifyOutcome};

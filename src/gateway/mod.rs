//! Gateway: statement classification and routing

mod errors;
mod gateway;
mod statement;

pub use errors::{GatewayError, GatewayResult};
pub use gateway::{Gateway, GatewayOptions};
pub use statement::{classify, Classified};

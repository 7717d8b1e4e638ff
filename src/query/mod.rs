//! Query values and results shared by the gateway and tablet backends

mod result;
mod value;

pub use result::{Field, QueryResult};
pub use value::{Row, Value};

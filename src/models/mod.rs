//! All structured models decoded out of device replies

mod interface;
pub use interface::*;

mod rpc_error;
pub use rpc_error::*;

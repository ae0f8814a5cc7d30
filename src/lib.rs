//! Library for reading and setting the access VLANs of physical interfaces
//! on Cisco NX-OS switches, over NETCONF.
//!
//! ## Examples
//! ```no_run
//! # #[cfg(feature = "ssh")]
//! # fn main() -> nxvlan::Result<()> {
//! use nxvlan::*;
//!
//! let device = Device::new("10.0.0.1", "admin", "secret");
//! let service = InterfaceService::new(SshSessionFactory::new());
//!
//! // list every interface along with its access VLAN
//! for record in service.list_interfaces(&device)? {
//!     println!("{}\t\tVLAN: {}", record.id(), record.access_vlan());
//! }
//!
//! // or change one, which reads the interface back to confirm
//! match service.update_vlan(&device, "eth1/5", "30") {
//!     Ok(record) => println!("{} is now on {}", record.id(), record.access_vlan()),
//!     Err(Error::ProtocolError(err)) => {
//!         // the device refused, and told us why
//!         println!("rejected: {}", err.message());
//!     }
//!     Err(Error::Unconfirmed(err)) => {
//!         // the write may or may not have happened
//!         println!("could not confirm: {}", err);
//!     }
//!     Err(e) => return Err(e),
//! }
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "ssh"))]
//! # fn main() {}
//! ```
//!
//! Anything that can carry bytes both ways can host a [NetconfConnection],
//! so the SSH transport is optional (the `ssh` feature). Implement
//! [SessionFactory] to bring your own.
//!
//! ## Compatibility
//! This library has been written against the NX-OS device YANG model
//! (`http://cisco.com/ns/yang/cisco-nx-os-device`).

mod connection;
pub use connection::*;

mod device;
pub use device::*;

mod error;
pub use error::*;

mod filter;
pub use filter::*;

mod models;
pub use models::*;

mod reply;
pub use reply::{parse_edit_config_reply, parse_get_reply, parse_interface_list, reply_message_id};

mod service;
pub use service::*;

mod session;
pub use session::*;

#[cfg(feature = "ssh")]
mod ssh;
#[cfg(feature = "ssh")]
pub use ssh::*;

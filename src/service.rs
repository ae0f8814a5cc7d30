use crate::{
    edit_config_vlan, get_all_filter, get_one_filter, normalize_vlan, parse_edit_config_reply,
    parse_interface_list, sort_records, Datastore, Device, Error, InterfaceRecord, Result,
    Session, SessionFactory, SessionGuard, SortOrder,
};

/// Reads and updates the access VLANs of a device's physical interfaces.
///
/// Each operation opens its own session through the [SessionFactory], and
/// closes it again before returning, whatever the outcome. Sessions are
/// never shared between operations, nor retried.
pub struct InterfaceService<F> {
    factory: F,
    sort_order: SortOrder,
}

impl<F: SessionFactory> InterfaceService<F> {
    /// Creates a new [InterfaceService] opening sessions via `factory`.
    /// Interface lists come back in [SortOrder::Lexical] order.
    pub fn new(factory: F) -> Self {
        InterfaceService {
            factory,
            sort_order: SortOrder::default(),
        }
    }

    /// Sort interface lists by `order` instead
    pub fn with_sort_order(mut self, order: SortOrder) -> Self {
        self.sort_order = order;
        self
    }

    /// Lists every physical interface of `device` with its access VLAN,
    /// sorted by id.
    pub fn list_interfaces(&self, device: &Device) -> Result<Vec<InterfaceRecord>> {
        let filter = get_all_filter();
        self.with_session(device, |session| {
            log::debug!("svc: listing interfaces of {}", device.address());
            let reply = session.get(&filter)?;
            let mut records = parse_interface_list(&reply)?;
            sort_records(&mut records, self.sort_order);
            Ok(records)
        })
    }

    /// Looks up interface `id`. Returns `Ok(None)` if the device doesn't
    /// know about it.
    ///
    /// If the device returns more than one entry, the first one wins.
    pub fn get_interface(&self, device: &Device, id: &str) -> Result<Option<InterfaceRecord>> {
        let filter = get_one_filter(id)?;
        self.with_session(device, |session| {
            log::debug!("svc: looking up {} on {}", id, device.address());
            let reply = session.get(&filter)?;
            Ok(parse_interface_list(&reply)?.into_iter().next())
        })
    }

    /// Sets the access VLAN of interface `id` to `vlan`, and reads the
    /// interface back to confirm.
    ///
    /// `vlan` is either a number (`30`) or in device form (`vlan-30`).
    /// Invalid input is rejected before a session gets opened. If the
    /// device rejects the edit, its [crate::RpcError] comes back as
    /// [Error::ProtocolError] and nothing is read back. If the edit is
    /// accepted but the read-back fails, or doesn't find the interface,
    /// the outcome of the write is unknown and [Error::Unconfirmed] is
    /// returned.
    pub fn update_vlan(&self, device: &Device, id: &str, vlan: &str) -> Result<InterfaceRecord> {
        let config = edit_config_vlan(id, vlan)?;
        let filter = get_one_filter(id)?;
        let expected = normalize_vlan(vlan)?;

        self.with_session(device, |session| {
            log::debug!("svc: setting {} to {} on {}", id, vlan, device.address());
            let reply = session.edit_config(Datastore::Running, &config)?;
            parse_edit_config_reply(&reply)?;

            let record = confirm(session, &filter, id)
                .map_err(|err| Error::Unconfirmed(Box::new(err)))?;
            if record.access_vlan() != expected {
                log::warn!(
                    "svc: {} reads back with VLAN {:?} after setting {}",
                    id,
                    record.access_vlan(),
                    vlan
                );
            }
            Ok(record)
        })
    }

    fn with_session<T>(
        &self,
        device: &Device,
        op: impl FnOnce(&mut F::Session) -> Result<T>,
    ) -> Result<T> {
        let mut guard = SessionGuard::new(self.factory.open(device)?);
        let result = op(guard.session());
        if let Err(err) = guard.close() {
            log::warn!("svc: failed to close session to {}: {}", device.address(), err);
        }
        result
    }
}

fn confirm<S: Session>(session: &mut S, filter: &str, id: &str) -> Result<InterfaceRecord> {
    let reply = session.get(filter)?;
    match parse_interface_list(&reply)?.into_iter().next() {
        Some(record) => Ok(record),
        None => Err(Error::parse(
            format!("interface {} missing from the confirming read", id),
            &reply,
        )),
    }
}

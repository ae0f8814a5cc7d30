use std::cmp::Ordering;

use crate::reply::PhysIfEntry;

/// A physical interface and the access VLAN assigned to it, as reported by
/// the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceRecord {
    id: String,
    access_vlan: String,
}

impl InterfaceRecord {
    /// Builds a record out of one `PhysIf-list` entry of a get reply. Returns
    /// None if the entry does not carry an interface id, since such an entry
    /// cannot be told apart from any other.
    ///
    /// A missing `accessVlan` is kept as an empty string.
    pub(crate) fn from_entry(entry: &PhysIfEntry) -> Option<Self> {
        let id = match entry.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id,
            _ => {
                log::error!("ifc: found a PhysIf-list entry without an id");
                return None;
            }
        };
        let access_vlan = entry
            .phys_items
            .as_ref()
            .and_then(|items| items.access_vlan.as_deref())
            .map(str::trim)
            .unwrap_or_default();

        Some(Self {
            id: id.to_owned(),
            access_vlan: access_vlan.to_owned(),
        })
    }

    /// Interface id, e.g. `eth1/1`
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Access VLAN as reported by the device, e.g. `vlan-10`
    pub fn access_vlan(&self) -> &str {
        &self.access_vlan
    }

    /// The numeric part of [InterfaceRecord::access_vlan], if the device used
    /// the usual `vlan-<n>` form
    pub fn vlan_id(&self) -> Option<u16> {
        self.access_vlan
            .strip_prefix(crate::VLAN_PREFIX)
            .and_then(|n| n.parse().ok())
    }
}

/// How interface listings are ordered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Plain byte-wise comparison of ids, so `eth1/10` sorts before `eth1/2`
    #[default]
    Lexical,
    /// Runs of digits compare by numeric value, so `eth1/2` sorts before
    /// `eth1/10`
    Natural,
}

impl SortOrder {
    /// Compares two interface ids under this ordering
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match self {
            SortOrder::Lexical => a.as_bytes().cmp(b.as_bytes()),
            SortOrder::Natural => natural_cmp(a, b),
        }
    }
}

/// Stable sort of `records` by id. Records with equal ids keep the order in
/// which the device listed them.
pub fn sort_records(records: &mut [InterfaceRecord], order: SortOrder) {
    records.sort_by(|a, b| order.compare(&a.id, &b.id));
}

/// Numeric-aware comparison. Falls back to byte-wise comparison when two ids
/// only differ in leading zeros, so that the ordering stays total.
fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (mut x, mut y) = (a.as_bytes(), b.as_bytes());
    loop {
        match (x.first(), y.first()) {
            (None, None) => return a.as_bytes().cmp(b.as_bytes()),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(cx), Some(cy)) if cx.is_ascii_digit() && cy.is_ascii_digit() => {
                let (nx, rx) = split_digits(x);
                let (ny, ry) = split_digits(y);
                let (nx, ny) = (trim_zeros(nx), trim_zeros(ny));
                let ord = nx.len().cmp(&ny.len()).then_with(|| nx.cmp(ny));
                if ord != Ordering::Equal {
                    return ord;
                }
                x = rx;
                y = ry;
            }
            (Some(cx), Some(cy)) => {
                if cx != cy {
                    return cx.cmp(cy);
                }
                x = &x[1..];
                y = &y[1..];
            }
        }
    }
}

#[inline]
fn split_digits(s: &[u8]) -> (&[u8], &[u8]) {
    let end = s.iter().position(|c| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}

#[inline]
fn trim_zeros(s: &[u8]) -> &[u8] {
    let start = s.iter().position(|c| *c != b'0').unwrap_or(s.len());
    &s[start..]
}

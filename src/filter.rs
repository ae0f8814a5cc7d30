//! Construction of the XML bodies we send to the device: subtree filters
//! for `get`, and `config` elements for `edit-config`.
//!
//! Interface ids and VLANs come from the caller, so they are always escaped
//! on the way in, and rejected outright when they contain characters XML
//! cannot carry at all.

use quick_xml::escape::escape;

use crate::{Error, Result};

/// Namespace of the NX-OS device YANG model
pub const NXOS_DEVICE_NS: &str = "http://cisco.com/ns/yang/cisco-nx-os-device";

/// Prefix the device model uses for access VLAN values
pub const VLAN_PREFIX: &str = "vlan-";

/// Subtree filter selecting every physical interface along with its
/// access VLAN
pub fn get_all_filter() -> String {
    phys_if_filter("")
}

/// Subtree filter selecting the physical interface `id` along with its
/// access VLAN
pub fn get_one_filter(id: &str) -> Result<String> {
    validate_id(id)?;
    Ok(phys_if_filter(id))
}

/// `config` element that sets the access VLAN of interface `id` to `vlan`.
///
/// `vlan` can be given either as the bare number (`30`) or in the device's
/// own form (`vlan-30`); either way the element ends up as `vlan-30`.
pub fn edit_config_vlan(id: &str, vlan: &str) -> Result<String> {
    validate_id(id)?;
    let vlan = normalize_vlan(vlan)?;

    let mut xml = XmlFragment::default();
    xml.open("config", None);
    xml.open("System", Some(("xmlns", NXOS_DEVICE_NS)));
    xml.open("intf-items", None);
    xml.open("phys-items", None);
    xml.open("PhysIf-list", None);
    xml.leaf("id", id);
    xml.leaf("accessVlan", &vlan);
    xml.close("PhysIf-list");
    xml.close("phys-items");
    xml.close("intf-items");
    xml.close("System");
    xml.close("config");
    Ok(xml.finish())
}

/// Turns `30` or `vlan-30` into `vlan-30`. The numeric part must be a
/// plain run of ASCII digits that fits a VLAN tag field.
pub fn normalize_vlan(vlan: &str) -> Result<String> {
    let number = vlan.strip_prefix(VLAN_PREFIX).unwrap_or(vlan);
    if number.is_empty() {
        return Err(Error::InvalidInput("VLAN must not be empty".into()));
    }
    if !number.bytes().all(|c| c.is_ascii_digit()) || number.parse::<u16>().is_err() {
        return Err(Error::InvalidInput(format!(
            "VLAN {:?} is not a numeric VLAN identifier",
            vlan
        )));
    }
    Ok(format!("{}{}", VLAN_PREFIX, number))
}

fn phys_if_filter(id: &str) -> String {
    let mut xml = XmlFragment::default();
    xml.open("System", Some(("xmlns", NXOS_DEVICE_NS)));
    xml.open("intf-items", None);
    xml.open("phys-items", None);
    xml.open("PhysIf-list", None);
    xml.leaf("id", id);
    xml.open("phys-items", None);
    xml.leaf("accessVlan", "");
    xml.close("phys-items");
    xml.close("PhysIf-list");
    xml.close("phys-items");
    xml.close("intf-items");
    xml.close("System");
    xml.finish()
}

/// Interface ids are opaque, but they have to survive the trip through an
/// XML text node: markup characters get escaped, control characters (and
/// the two non-characters XML 1.0 excludes) can't be represented at all.
fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::InvalidInput("interface id must not be empty".into()));
    }
    if let Some(c) = id
        .chars()
        .find(|c| c.is_control() || matches!(c, '\u{FFFE}' | '\u{FFFF}'))
    {
        return Err(Error::InvalidInput(format!(
            "interface id contains invalid character {:?}",
            c
        )));
    }
    Ok(())
}

/// Minimal indented element writer. Text and attribute values are escaped,
/// element names are trusted constants.
#[derive(Default)]
struct XmlFragment {
    out: String,
    depth: usize,
}

impl XmlFragment {
    fn open(&mut self, name: &str, attr: Option<(&str, &str)>) {
        self.indent();
        self.out.push('<');
        self.out.push_str(name);
        if let Some((key, value)) = attr {
            self.out.push_str(&format!(" {}=\"{}\"", key, escape(value)));
        }
        self.out.push_str(">\n");
        self.depth += 1;
    }

    fn leaf(&mut self, name: &str, text: &str) {
        self.indent();
        self.out
            .push_str(&format!("<{}>{}</{}>\n", name, escape(text), name));
    }

    fn close(&mut self, name: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.indent();
        self.out.push_str(&format!("</{}>\n", name));
    }

    #[inline]
    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
    }

    fn finish(mut self) -> String {
        if self.out.ends_with('\n') {
            self.out.pop();
        }
        self.out
    }
}

//! Decoding of `rpc-reply` documents.
//!
//! A single serde model ([RpcReply]) covers both reply shapes the device
//! sends: `data` for a successful get, and `rpc-error` for a rejected
//! request. Which shape is acceptable depends on the operation, so the
//! entry points here are per operation:
//!
//! * [parse_get_reply] / [parse_interface_list] for replies to a get
//! * [parse_edit_config_reply] for replies to an edit-config
//!
//! Anything that does not decode against the expected schema comes back as
//! [Error::ParseError], carrying the raw reply.

use quick_xml::{events::Event, Reader};
use serde::Deserialize;

use crate::{sort_records, Error, InterfaceRecord, Result, RpcError, SortOrder};

/// Decodes the reply to an all-interfaces get, and returns the interfaces
/// sorted by id (byte-wise, stable).
///
/// An empty interface list is a valid, empty result.
pub fn parse_get_reply(xml: &str) -> Result<Vec<InterfaceRecord>> {
    let mut records = parse_interface_list(xml)?;
    sort_records(&mut records, SortOrder::Lexical);
    Ok(records)
}

/// Decodes the reply to a get, keeping interfaces in the order the device
/// listed them.
///
/// A get never produces an [Error::ProtocolError]: a reply carrying an
/// `rpc-error` instead of `data` is reported as [Error::ParseError].
pub fn parse_interface_list(xml: &str) -> Result<Vec<InterfaceRecord>> {
    let shape = scan_reply(xml)?;
    let reply = decode(xml)?;

    if shape.has_child("rpc-error") {
        let message = reply
            .rpc_errors
            .into_iter()
            .find_map(RpcError::from_raw)
            .map(|e| e.message().to_owned())
            .unwrap_or_default();
        log::error!("reply: get reply carried an rpc-error: {}", message);
        return Err(Error::parse(
            format!("get reply carried an rpc-error: {}", message),
            xml,
        ));
    }
    if !shape.has_child("data") {
        log::error!("reply: get reply without a data element");
        return Err(Error::parse("reply has no data element", xml));
    }

    let entries = reply
        .data
        .and_then(|d| d.system)
        .and_then(|s| s.intf_items)
        .and_then(|i| i.phys_items)
        .map(|p| p.entries)
        .unwrap_or_default();

    let mut records = Vec::with_capacity(entries.len());
    for entry in &entries {
        match InterfaceRecord::from_entry(entry) {
            Some(record) => records.push(record),
            None => return Err(Error::parse("interface entry without an id", xml)),
        }
    }
    log::debug!("reply: decoded {} interface entries", records.len());
    Ok(records)
}

/// Decodes the reply to an edit-config. The first `rpc-error` carrying a
/// non-empty `error-message` is returned as [Error::ProtocolError]; any
/// other well-formed reply is a success.
pub fn parse_edit_config_reply(xml: &str) -> Result<()> {
    scan_reply(xml)?;
    let reply = decode(xml)?;
    match reply.rpc_errors.into_iter().find_map(RpcError::from_raw) {
        Some(err) => {
            log::debug!("reply: device rejected edit-config: {}", err);
            Err(Error::ProtocolError(err))
        }
        None => Ok(()),
    }
}

/// Returns the `message-id` attribute of a reply, if the reply is well-formed
/// and carries one
pub fn reply_message_id(xml: &str) -> Option<String> {
    scan_reply(xml).ok().and_then(|shape| shape.message_id)
}

fn decode(xml: &str) -> Result<RpcReply> {
    quick_xml::de::from_str(xml).map_err(|e| {
        log::error!("reply: failed to decode rpc-reply: {}", e);
        Error::parse(e.to_string(), xml)
    })
}

/// The outline of a document: what serde can't tell us, i.e. the name of the
/// root element and which top-level children are present at all (an empty
/// `<data/>` is still a data reply).
#[derive(Debug)]
pub(crate) struct DocumentShape {
    message_id: Option<String>,
    children: Vec<String>,
}

impl DocumentShape {
    pub(crate) fn has_child(&self, name: &str) -> bool {
        self.children.iter().any(|c| c == name)
    }
}

fn scan_reply(xml: &str) -> Result<DocumentShape> {
    scan_document(xml, "rpc-reply")
}

/// Walks the whole document once, checking that it is well-formed, that the
/// root is named `root` (ignoring any namespace prefix), and collecting the
/// root's children.
pub(crate) fn scan_document(xml: &str, root: &str) -> Result<DocumentShape> {
    let mut reader = Reader::from_str(xml);
    let mut shape: Option<DocumentShape> = None;
    let mut depth = 0_usize;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::parse(format!("not well-formed: {}", e), xml))?;
        let (start, is_empty) = match event {
            Event::Start(start) => (start, false),
            Event::Empty(start) => (start, true),
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                continue;
            }
            Event::Eof => break,
            _ => continue,
        };

        let name = std::str::from_utf8(start.local_name().as_ref())?.to_owned();
        if depth == 0 {
            if shape.is_some() {
                return Err(Error::parse("more than one root element", xml));
            }
            if name != root {
                log::error!("reply: unexpected root element {}", name);
                return Err(Error::parse(
                    format!("expected {}, found {}", root, name),
                    xml,
                ));
            }
            let mut message_id = None;
            for attr in start.attributes().flatten() {
                if attr.key.local_name().as_ref() == b"message-id" {
                    message_id = Some(std::str::from_utf8(&attr.value)?.to_owned());
                }
            }
            shape = Some(DocumentShape {
                message_id,
                children: vec![],
            });
        } else if depth == 1 {
            if let Some(shape) = shape.as_mut() {
                shape.children.push(name);
            }
        }
        if !is_empty {
            depth += 1;
        }
    }

    if depth != 0 {
        return Err(Error::parse("unexpected end of document", xml));
    }
    shape.ok_or_else(|| Error::parse("empty document", xml))
}

#[derive(Debug, Deserialize)]
pub(crate) struct RpcReply {
    #[serde(default)]
    pub(crate) data: Option<Data>,
    #[serde(rename = "rpc-error", default)]
    pub(crate) rpc_errors: Vec<RawRpcError>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Data {
    #[serde(rename = "System", default)]
    system: Option<SystemItems>,
}

#[derive(Debug, Default, Deserialize)]
struct SystemItems {
    #[serde(rename = "intf-items", default)]
    intf_items: Option<IntfItems>,
}

#[derive(Debug, Default, Deserialize)]
struct IntfItems {
    #[serde(rename = "phys-items", default)]
    phys_items: Option<PhysItems>,
}

#[derive(Debug, Default, Deserialize)]
struct PhysItems {
    #[serde(rename = "PhysIf-list", default)]
    entries: Vec<PhysIfEntry>,
}

/// One `PhysIf-list` entry
#[derive(Debug, Default, Deserialize)]
pub(crate) struct PhysIfEntry {
    #[serde(default)]
    pub(crate) id: Option<String>,
    #[serde(rename = "phys-items", default)]
    pub(crate) phys_items: Option<PhysIfState>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PhysIfState {
    #[serde(rename = "accessVlan", default)]
    pub(crate) access_vlan: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawRpcError {
    #[serde(rename = "error-type", default)]
    pub(crate) error_type: String,
    #[serde(rename = "error-tag", default)]
    pub(crate) error_tag: String,
    #[serde(rename = "error-severity", default)]
    pub(crate) error_severity: String,
    #[serde(rename = "error-message", default)]
    pub(crate) error_message: Option<RawErrorMessage>,
    #[serde(rename = "error-path", default)]
    pub(crate) error_path: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawErrorMessage {
    #[serde(rename = "@xml:lang", alias = "@lang", default)]
    pub(crate) lang: Option<String>,
    #[serde(rename = "$text", default)]
    pub(crate) text: String,
}

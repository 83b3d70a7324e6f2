//! LastChange document encoding and decoding
//!
//! A LastChange document lists the variables that changed in one
//! transaction, each as an empty element named after the variable with
//! the value in a `val` attribute:
//!
//! ```xml
//! <Event xmlns="urn:schemas-upnp-org:metadata-1-0/AVT/">
//!   <InstanceID val="0">
//!     <TransportState val="PLAYING"/>
//!     <CurrentTrackURI val="http://host/track.flac"/>
//!   </InstanceID>
//! </Event>
//! ```
//!
//! Encoding is a pure projection of `(name, value)` pairs; nothing keeps
//! a handle into a live document.

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::error::{CollectorError, Result};

/// Namespace of AVTransport LastChange documents
pub const AV_TRANSPORT_NAMESPACE: &str = "urn:schemas-upnp-org:metadata-1-0/AVT/";

/// Namespace of RenderingControl LastChange documents
pub const RENDERING_CONTROL_NAMESPACE: &str = "urn:schemas-upnp-org:metadata-1-0/RCS/";

/// The renderer exposes a single instance of each service
const INSTANCE_ID: &str = "0";

/// Encode changed variables into a LastChange document
pub fn encode<'a, I>(namespace: &str, changes: I) -> Result<String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut writer = Writer::new(Vec::new());

    let mut event = BytesStart::new("Event");
    event.push_attribute(("xmlns", namespace));
    writer.write_event(Event::Start(event))?;

    let mut instance = BytesStart::new("InstanceID");
    instance.push_attribute(("val", INSTANCE_ID));
    writer.write_event(Event::Start(instance))?;

    for (name, value) in changes {
        let mut element = BytesStart::new(name);
        element.push_attribute(("val", value));
        writer.write_event(Event::Empty(element))?;
    }

    writer.write_event(Event::End(BytesEnd::new("InstanceID")))?;
    writer.write_event(Event::End(BytesEnd::new("Event")))?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| CollectorError::Document(format!("Non UTF-8 output: {}", e)))
}

/// Decode a LastChange document back into `(name, value)` pairs
///
/// Elements without a `val` attribute are skipped. Namespace prefixes on
/// element names are dropped.
pub fn decode(xml: &str) -> Result<Vec<(String, String)>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut variables = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(element) | Event::Empty(element) => {
                let local = element.local_name();
                let name = std::str::from_utf8(local.as_ref())
                    .map_err(|e| CollectorError::Document(e.to_string()))?;
                if name == "Event" || name == "InstanceID" {
                    continue;
                }
                if let Some(attr) = element.try_get_attribute("val")? {
                    let value = attr.unescape_value()?;
                    variables.push((name.to_string(), value.into_owned()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(variables)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_single_variable() {
        let xml = encode(AV_TRANSPORT_NAMESPACE, [("TransportState", "PLAYING")]).unwrap();
        assert_eq!(
            xml,
            "<Event xmlns=\"urn:schemas-upnp-org:metadata-1-0/AVT/\">\
             <InstanceID val=\"0\"><TransportState val=\"PLAYING\"/></InstanceID></Event>"
        );
    }

    #[test]
    fn test_encode_escapes_values() {
        let xml = encode(
            AV_TRANSPORT_NAMESPACE,
            [("AVTransportURI", "http://host/a?x=1&y=\"2\"")],
        )
        .unwrap();
        assert!(xml.contains("&amp;"));
        assert!(xml.contains("&quot;"));
        assert!(!xml.contains("x=1&y"));
    }

    #[test]
    fn test_encode_empty_change_set() {
        let xml = encode(RENDERING_CONTROL_NAMESPACE, std::iter::empty()).unwrap();
        assert!(xml.contains("<InstanceID val=\"0\"></InstanceID>"));
    }

    #[test]
    fn test_decode_document() {
        let xml = r#"<Event xmlns="urn:schemas-upnp-org:metadata-1-0/RCS/">
            <InstanceID val="0">
                <Volume channel="Master" val="42"/>
                <Mute channel="Master" val="0"/>
            </InstanceID>
        </Event>"#;

        let vars = decode(xml).unwrap();
        assert_eq!(
            vars,
            vec![
                ("Volume".to_string(), "42".to_string()),
                ("Mute".to_string(), "0".to_string()),
            ]
        );
    }

    #[test]
    fn test_decode_reads_back_escaped_values() {
        let uri = "http://host/a?x=1&y=<2>";
        let xml = encode(AV_TRANSPORT_NAMESPACE, [("AVTransportURI", uri)]).unwrap();
        let vars = decode(&xml).unwrap();
        assert_eq!(vars, vec![("AVTransportURI".to_string(), uri.to_string())]);
    }

    #[test]
    fn test_decode_rejects_broken_xml() {
        assert!(decode("<Event><InstanceID val=\"0\"></Event>").is_err());
    }
}

//! DIDL-Lite rendering of track metadata
//!
//! CurrentTrackMetaData carries a one-item DIDL-Lite document built from
//! the tags the engine has collected. Empty tags are left out.

use output::{Tag, TrackMetadata};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::{RendererError, Result};

const DIDL_NAMESPACE: &str = "urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/";
const DC_NAMESPACE: &str = "http://purl.org/dc/elements/1.1/";
const UPNP_NAMESPACE: &str = "urn:schemas-upnp-org:metadata-1-0/upnp/";

fn element_name(tag: Tag) -> &'static str {
    match tag {
        Tag::Title => "dc:title",
        Tag::Artist => "upnp:artist",
        Tag::Album => "upnp:album",
        Tag::Genre => "upnp:genre",
        Tag::Composer => "dc:creator",
    }
}

/// Encode `meta` as DIDL-Lite; no tags at all yields an empty string
pub fn encode(meta: &TrackMetadata) -> Result<String> {
    if meta.is_empty() {
        return Ok(String::new());
    }

    let mut writer = Writer::new(Vec::new());

    let mut root = BytesStart::new("DIDL-Lite");
    root.push_attribute(("xmlns", DIDL_NAMESPACE));
    root.push_attribute(("xmlns:dc", DC_NAMESPACE));
    root.push_attribute(("xmlns:upnp", UPNP_NAMESPACE));
    writer.write_event(Event::Start(root))?;

    let mut item = BytesStart::new("item");
    item.push_attribute(("id", ""));
    writer.write_event(Event::Start(item))?;

    for tag in Tag::ALL {
        let value = meta.get(tag);
        if value.is_empty() {
            continue;
        }
        let name = element_name(tag);
        writer.write_event(Event::Start(BytesStart::new(name)))?;
        writer.write_event(Event::Text(BytesText::new(value)))?;
        writer.write_event(Event::End(BytesEnd::new(name)))?;
    }

    writer.write_event(Event::End(BytesEnd::new("item")))?;
    writer.write_event(Event::End(BytesEnd::new("DIDL-Lite")))?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| RendererError::InvalidArgument(format!("Non UTF-8 metadata: {}", e)))
}

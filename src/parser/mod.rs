//! XML parsing for CityGML documents
//!
//! The driver reads markup events with quick-xml and feeds them to a
//! [`ParsingFactory`], which owns all CityGML semantics.

mod coordinates;
mod elements;
mod factory;
mod frame;

use std::collections::HashMap;
use std::io::BufRead;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::config::ParserConfig;
use crate::error::{Error, Result};

pub use factory::{ParseOutcome, ParsingFactory};

/// Default buffer capacity for XML parsing (4KB)
const XML_BUFFER_CAPACITY: usize = 4096;

/// Get the local name of an element or attribute (the part after the colon)
///
/// `bldg:Building` has local name `Building`; names without a prefix are
/// returned unchanged.
pub(crate) fn get_local_name(name_str: &str) -> &str {
    if let Some(pos) = name_str.rfind(':') {
        &name_str[pos + 1..]
    } else {
        name_str
    }
}

/// Get an attribute value by its local name, regardless of namespace prefix
///
/// `gml:id` and `id` both match `"id"`; `xlink:href` matches `"href"`.
pub(crate) fn get_attr_by_local_name(
    attrs: &HashMap<String, String>,
    local_name: &str,
) -> Option<String> {
    attrs.iter().find_map(|(key, value)| {
        if get_local_name(key) == local_name {
            Some(value.clone())
        } else {
            None
        }
    })
}

/// Parse attributes from an XML start tag
pub(crate) fn parse_attributes(e: &BytesStart) -> Result<HashMap<String, String>> {
    let mut attrs = HashMap::with_capacity(8);

    for attr in e.attributes() {
        let attr = attr?;
        let key =
            std::str::from_utf8(attr.key.as_ref()).map_err(|e| Error::XmlAttr(e.to_string()))?;
        let value = std::str::from_utf8(&attr.value).map_err(|e| Error::XmlAttr(e.to_string()))?;
        attrs.insert(key.to_string(), value.to_string());
    }

    Ok(attrs)
}

/// Parse a CityGML document held in memory
///
/// # Example
///
/// ```
/// use citygml::{ParserConfig, parse_str};
///
/// let xml = r#"<core:CityModel xmlns:core="http://www.opengis.net/citygml/2.0"
///                              xmlns:bldg="http://www.opengis.net/citygml/building/2.0"
///                              xmlns:gml="http://www.opengis.net/gml">
///   <core:cityObjectMember>
///     <bldg:Building gml:id="B1"/>
///   </core:cityObjectMember>
/// </core:CityModel>"#;
///
/// let outcome = parse_str(xml, ParserConfig::default())?;
/// assert_eq!(outcome.model.object_count(), 1);
/// # Ok::<(), citygml::Error>(())
/// ```
pub fn parse_str(xml: &str, config: ParserConfig) -> Result<ParseOutcome> {
    drive(Reader::from_str(xml), config)
}

/// Parse a CityGML document from a buffered reader
pub fn parse_reader<R: BufRead>(reader: R, config: ParserConfig) -> Result<ParseOutcome> {
    drive(Reader::from_reader(reader), config)
}

fn drive<R: BufRead>(mut reader: Reader<R>, config: ParserConfig) -> Result<ParseOutcome> {
    {
        let reader_config = reader.config_mut();
        reader_config.trim_text(false);
        // Empty elements arrive as a start and an end event
        reader_config.expand_empty_elements = true;
        // Nesting is checked by the factory, which reports the byte offset
        reader_config.check_end_names = false;
    }

    let mut factory = ParsingFactory::new(config);
    let mut buf = Vec::with_capacity(XML_BUFFER_CAPACITY);

    loop {
        factory.set_byte_offset(reader.buffer_position());

        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                let name = std::str::from_utf8(e.name().as_ref())
                    .map_err(|e| Error::XmlAttr(e.to_string()))?
                    .to_string();
                let attrs = parse_attributes(e)?;
                factory.open_element(&name, &attrs)?;
            }
            Event::End(ref e) => {
                let name = std::str::from_utf8(e.name().as_ref())
                    .map_err(|e| Error::XmlAttr(e.to_string()))?
                    .to_string();
                factory.close_element(&name)?;
            }
            Event::Text(ref t) => {
                let text = t
                    .decode()
                    .map_err(|e| Error::ParseError(format!("Invalid text content: {}", e)))?;
                factory.text(&text)?;
            }
            Event::CData(ref c) => {
                let text = std::str::from_utf8(c.as_ref())
                    .map_err(|e| Error::ParseError(format!("CDATA is not valid UTF-8: {}", e)))?;
                factory.text(text)?;
            }
            Event::GeneralRef(ref r) => {
                let char_ref = r
                    .resolve_char_ref()
                    .map_err(|e| Error::ParseError(format!("Invalid character reference: {}", e)))?;
                let resolved = match char_ref {
                    Some(ch) => ch.to_string(),
                    None => {
                        let entity = std::str::from_utf8(r.as_ref()).map_err(|e| {
                            Error::ParseError(format!("Entity name is not valid UTF-8: {}", e))
                        })?;
                        quick_xml::escape::resolve_predefined_entity(entity)
                            .map(str::to_string)
                            .ok_or_else(|| {
                                Error::ParseError(format!("Unknown entity reference &{};", entity))
                            })?
                    }
                };
                factory.text(&resolved)?;
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions and DTDs carry no model content
            _ => {}
        }
        buf.clear();
    }

    factory.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_names() {
        assert_eq!(get_local_name("bldg:Building"), "Building");
        assert_eq!(get_local_name("Building"), "Building");
    }

    #[test]
    fn test_attr_by_local_name() {
        let mut attrs = HashMap::new();
        attrs.insert("xlink:href".to_string(), "#app1".to_string());
        assert_eq!(get_attr_by_local_name(&attrs, "href").as_deref(), Some("#app1"));
        assert_eq!(get_attr_by_local_name(&attrs, "id"), None);
    }

    #[test]
    fn test_entities_in_text() {
        let xml = r#"<core:CityModel><gml:name>Smith &amp; Sons &#65;</gml:name></core:CityModel>"#;
        let outcome = parse_str(xml, ParserConfig::default()).unwrap();
        assert_eq!(outcome.model.name(), Some("Smith & Sons A"));
    }

    #[test]
    fn test_unclosed_document() {
        let err =
            parse_str("<core:CityModel><bldg:Building>", ParserConfig::default()).unwrap_err();
        assert!(matches!(err, Error::MalformedStructure(_)));
    }

    #[test]
    fn test_mismatched_end_tag_reports_offset() {
        let xml = "<core:CityModel><bldg:Building></core:CityModel>";
        let err = parse_str(xml, ParserConfig::default()).unwrap_err();
        assert!(matches!(err, Error::MalformedStructure(_)));
        assert!(err.to_string().contains("Location: byte 31"));
    }
}

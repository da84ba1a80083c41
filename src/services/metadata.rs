//! Mod metadata document handling.
//!
//! RimWorld mods carry their metadata in `About/About.xml`: a root element
//! with optional `name` and `description` children. This module reads those
//! two fields and can rewrite the `name` element's text while passing every
//! other byte of the document through untouched. Nothing else in the file is
//! interpreted.

use camino::Utf8Path;
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesText, Event};
use thiserror::Error;

/// Active metadata file read by the game.
pub const ABOUT_FILE: &str = "About.xml";

/// Backup slot holding the alternate-language counterpart.
pub const BACKUP_FILE: &str = "About_old.xml";

/// Transient name used during a three-way swap.
pub const TEMP_FILE: &str = "About_temp.xml";

/// Metadata subfolder inside each mod folder.
pub const ABOUT_DIR: &str = "About";

/// Errors from reading or rewriting a metadata document.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("metadata document is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("metadata document has no name element")]
    NameFieldAbsent,
}

/// The two fields this tool reads from a metadata document.
///
/// `name: None` means the element is absent entirely, which makes the
/// document ineligible for every operation. A present-but-empty element
/// parses as `Some("")`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AboutMetadata {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl AboutMetadata {
    /// Display name with the placeholder the AI message contract expects
    /// when the element is present but empty.
    pub fn effective_name(&self) -> Option<String> {
        self.name.as_ref().map(|name| {
            if name.is_empty() {
                "未找到名称".to_string()
            } else {
                name.clone()
            }
        })
    }

    /// Description with the placeholder used when absent or empty.
    pub fn effective_description(&self) -> String {
        match self.description.as_deref() {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => "未找到描述".to_string(),
        }
    }
}

/// True if the text contains a CJK ideograph (U+4E00..=U+9FFF).
///
/// Presence of such a character in the display name is the sole signal that
/// a mod has already been translated.
pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(|c| ('\u{4e00}'..='\u{9fff}').contains(&c))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    Description,
}

/// Parse the `name` and `description` children of the root element.
///
/// Only direct children of the root are considered; deeper elements with the
/// same tag names are ignored. Text split across entity references is
/// accumulated.
pub fn parse_metadata(xml: &str) -> Result<AboutMetadata, MetadataError> {
    let mut reader = Reader::from_str(xml);
    let mut depth = 0usize;
    let mut capture: Option<Field> = None;
    let mut metadata = AboutMetadata::default();

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(start) => {
                depth += 1;
                if depth == 2 {
                    capture = match start.local_name().as_ref() {
                        b"name" => {
                            metadata.name.get_or_insert_with(String::new);
                            Some(Field::Name)
                        }
                        b"description" => {
                            metadata.description.get_or_insert_with(String::new);
                            Some(Field::Description)
                        }
                        _ => None,
                    };
                }
            }
            Event::Empty(empty) => {
                // Self-closing child of the root counts as present but empty.
                if depth == 1 {
                    match empty.local_name().as_ref() {
                        b"name" => {
                            metadata.name.get_or_insert_with(String::new);
                        }
                        b"description" => {
                            metadata.description.get_or_insert_with(String::new);
                        }
                        _ => {}
                    }
                }
            }
            Event::End(_) => {
                if depth == 2 {
                    capture = None;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Text(text) => {
                if depth == 2 {
                    if let Some(field) = capture {
                        let decoded = text.unescape()?;
                        match field {
                            Field::Name => {
                                if let Some(name) = metadata.name.as_mut() {
                                    name.push_str(&decoded);
                                }
                            }
                            Field::Description => {
                                if let Some(description) = metadata.description.as_mut() {
                                    description.push_str(&decoded);
                                }
                            }
                        }
                    }
                }
            }
            Event::CData(cdata) => {
                if depth == 2 {
                    if let Some(field) = capture {
                        let decoded = String::from_utf8_lossy(cdata.as_ref()).into_owned();
                        match field {
                            Field::Name => {
                                if let Some(name) = metadata.name.as_mut() {
                                    name.push_str(&decoded);
                                }
                            }
                            Field::Description => {
                                if let Some(description) = metadata.description.as_mut() {
                                    description.push_str(&decoded);
                                }
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }

    Ok(metadata)
}

/// Read and parse a metadata file.
pub fn load_metadata(path: &Utf8Path) -> Result<AboutMetadata, MetadataError> {
    let xml = std::fs::read_to_string(path)?;
    parse_metadata(&xml)
}

/// Rewrite the root-level `name` element's text, leaving everything else in
/// the document byte-for-byte intact (declaration, attributes, ordering,
/// whitespace, unrelated elements).
///
/// Returns [`MetadataError::NameFieldAbsent`] when the document has no name
/// element to rewrite.
pub fn rewrite_display_name(xml: &str, new_name: &str) -> Result<String, MetadataError> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());
    let mut depth = 0usize;
    let mut in_name = false;
    let mut replaced = false;

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(start) => {
                depth += 1;
                let is_target =
                    depth == 2 && start.local_name().as_ref() == b"name" && !replaced;
                writer.write_event(Event::Start(start))?;
                if is_target {
                    writer.write_event(Event::Text(BytesText::new(new_name)))?;
                    in_name = true;
                    replaced = true;
                }
            }
            Event::Empty(empty) => {
                if depth == 1 && empty.local_name().as_ref() == b"name" && !replaced {
                    let end = empty.to_end().into_owned();
                    writer.write_event(Event::Start(empty))?;
                    writer.write_event(Event::Text(BytesText::new(new_name)))?;
                    writer.write_event(Event::End(end))?;
                    replaced = true;
                } else {
                    writer.write_event(Event::Empty(empty))?;
                }
            }
            Event::End(end) => {
                if in_name && depth == 2 {
                    in_name = false;
                }
                depth = depth.saturating_sub(1);
                writer.write_event(Event::End(end))?;
            }
            // Original text inside the name element is dropped in favor of
            // the replacement written right after its start tag.
            Event::Text(text) => {
                if !in_name {
                    writer.write_event(Event::Text(text))?;
                }
            }
            Event::CData(cdata) => {
                if !in_name {
                    writer.write_event(Event::CData(cdata))?;
                }
            }
            other => writer.write_event(other)?,
        }
    }

    if !replaced {
        return Err(MetadataError::NameFieldAbsent);
    }

    Ok(String::from_utf8(writer.into_inner())?)
}

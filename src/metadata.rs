//! Sprite sheet frame metadata (XML property lists).
//!
//! A sprite sheet `sheet.png` ships with `sheet.plist` describing the named
//! sub-rectangles packed into the image. Formats 0 through 3 of the layout
//! are supported:
//!
//! - **0**: numeric `x`, `y`, `width`, `height`, `offsetX`, `offsetY`,
//!   `originalWidth`, `originalHeight`
//! - **1, 2**: `frame`, `offset`, `sourceSize` strings, `rotated` (2 only)
//! - **3**: `textureRect`, `spriteOffset`, `spriteSourceSize`,
//!   `textureRotated`, optional `anchor`

use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::{PreloadError, Result};

/// A value in a property list.
#[derive(Debug, Clone, PartialEq)]
pub enum PlistValue {
    Dict(Vec<(String, PlistValue)>),
    Array(Vec<PlistValue>),
    String(String),
    Integer(i64),
    Real(f64),
    Bool(bool),
}

impl PlistValue {
    /// Look up a key in a dictionary value.
    pub fn get(&self, key: &str) -> Option<&PlistValue> {
        match self {
            PlistValue::Dict(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PlistValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric value; strings holding a number are accepted too.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            PlistValue::Integer(i) => Some(*i as f32),
            PlistValue::Real(r) => Some(*r as f32),
            PlistValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PlistValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Parse an XML property list document.
pub fn parse_plist(xml: &str) -> std::result::Result<PlistValue, String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) if e.name().as_ref() == b"plist" => {
                return next_value(&mut reader)?.ok_or_else(|| "empty plist".to_string());
            }
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                return parse_element(&mut reader, &name);
            }
            Event::Empty(e) => return empty_value(e.name().as_ref()),
            Event::Eof => return Err("document has no plist root".to_string()),
            _ => {}
        }
    }
}

/// Read the next value element, or `None` when the enclosing element ends.
fn next_value(reader: &mut Reader<&[u8]>) -> std::result::Result<Option<PlistValue>, String> {
    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                return parse_element(reader, &name).map(Some);
            }
            Event::Empty(e) => return empty_value(e.name().as_ref()).map(Some),
            Event::End(_) => return Ok(None),
            Event::Eof => return Err("unexpected end of document".to_string()),
            _ => {}
        }
    }
}

fn parse_element(reader: &mut Reader<&[u8]>, name: &[u8]) -> std::result::Result<PlistValue, String> {
    match name {
        b"dict" => {
            let mut entries = Vec::new();
            loop {
                match reader.read_event().map_err(|e| e.to_string())? {
                    Event::Start(e) if e.name().as_ref() == b"key" => {
                        let key = read_text(reader)?;
                        let value = next_value(reader)?
                            .ok_or_else(|| format!("key '{}' has no value", key))?;
                        entries.push((key, value));
                    }
                    Event::End(_) => return Ok(PlistValue::Dict(entries)),
                    Event::Eof => return Err("unterminated dict".to_string()),
                    Event::Start(e) | Event::Empty(e) => {
                        return Err(format!(
                            "expected key in dict, found <{}>",
                            String::from_utf8_lossy(e.name().as_ref())
                        ));
                    }
                    _ => {}
                }
            }
        }
        b"array" => {
            let mut items = Vec::new();
            while let Some(item) = next_value(reader)? {
                items.push(item);
            }
            Ok(PlistValue::Array(items))
        }
        b"string" | b"date" | b"data" => read_text(reader).map(PlistValue::String),
        b"integer" => {
            let text = read_text(reader)?;
            text.trim()
                .parse()
                .map(PlistValue::Integer)
                .map_err(|_| format!("invalid integer '{}'", text))
        }
        b"real" => {
            let text = read_text(reader)?;
            text.trim()
                .parse()
                .map(PlistValue::Real)
                .map_err(|_| format!("invalid real '{}'", text))
        }
        b"true" | b"false" => {
            read_text(reader)?;
            Ok(PlistValue::Bool(name == b"true"))
        }
        other => Err(format!(
            "unsupported plist element <{}>",
            String::from_utf8_lossy(other)
        )),
    }
}

fn empty_value(name: &[u8]) -> std::result::Result<PlistValue, String> {
    match name {
        b"true" => Ok(PlistValue::Bool(true)),
        b"false" => Ok(PlistValue::Bool(false)),
        b"dict" => Ok(PlistValue::Dict(Vec::new())),
        b"array" => Ok(PlistValue::Array(Vec::new())),
        b"string" | b"date" | b"data" => Ok(PlistValue::String(String::new())),
        other => Err(format!(
            "unsupported empty element <{}/>",
            String::from_utf8_lossy(other)
        )),
    }
}

/// Collect text up to the closing tag of the current element.
fn read_text(reader: &mut Reader<&[u8]>) -> std::result::Result<String, String> {
    let mut text = String::new();
    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Text(t) => text.push_str(&t.unescape().map_err(|e| e.to_string())?),
            Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c.into_inner())),
            Event::End(_) => return Ok(text),
            Event::Eof => return Err("unexpected end of document".to_string()),
            _ => {}
        }
    }
}

/// Parse every number out of a brace string like `{{2,4},{60,58}}`.
fn parse_numbers(text: &str) -> Vec<f32> {
    text.split(|c: char| c == '{' || c == '}' || c == ',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| part.parse().ok())
        .collect()
}

fn parse_point(value: Option<&PlistValue>) -> Option<[f32; 2]> {
    match parse_numbers(value?.as_str()?).as_slice() {
        [x, y] => Some([*x, *y]),
        _ => None,
    }
}

fn parse_rect(value: Option<&PlistValue>) -> Option<FrameRect> {
    match parse_numbers(value?.as_str()?).as_slice() {
        [x, y, width, height] => Some(FrameRect {
            x: *x,
            y: *y,
            width: *width,
            height: *height,
        }),
        _ => None,
    }
}

/// Sub-rectangle of a sprite sheet in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// One named frame inside a sprite sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteFrame {
    /// Frame name (e.g. `player_01_001.png`)
    pub name: String,
    /// Packed rectangle in the sheet
    pub rect: FrameRect,
    /// Whether the frame is stored rotated by 90 degrees
    pub rotated: bool,
    /// Offset of the trimmed rectangle from the original center
    pub offset: [f32; 2],
    /// Size before trimming
    pub original_size: [f32; 2],
    /// Pivot, when the sheet stores one
    pub anchor: Option<[f32; 2]>,
}

/// Parsed frame metadata for one sprite sheet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameMetadataSet {
    /// Layout format version
    pub format: i64,
    /// Texture file named by the metadata, if any
    pub texture_file: Option<String>,
    /// Frames in document order
    pub frames: Vec<SpriteFrame>,
}

impl FrameMetadataSet {
    /// Parse raw plist bytes read from `path`.
    pub fn parse(path: &Path, data: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(data).map_err(|e| PreloadError::metadata(path, e.to_string()))?;
        let root = parse_plist(text).map_err(|e| PreloadError::metadata(path, e))?;
        Self::from_plist(&root).map_err(|e| PreloadError::metadata(path, e))
    }

    /// Build the frame set from a parsed plist.
    pub fn from_plist(root: &PlistValue) -> std::result::Result<Self, String> {
        let metadata = root.get("metadata");
        let format = metadata
            .and_then(|m| m.get("format"))
            .and_then(PlistValue::as_f32)
            .map(|f| f as i64)
            .unwrap_or(0);
        let texture_file = metadata
            .and_then(|m| m.get("realTextureFileName").or_else(|| m.get("textureFileName")))
            .and_then(PlistValue::as_str)
            .map(str::to_string);

        let Some(PlistValue::Dict(entries)) = root.get("frames") else {
            return Err("missing 'frames' dictionary".to_string());
        };

        let mut frames = Vec::with_capacity(entries.len());
        for (name, frame) in entries {
            let parsed = match format {
                0 => Self::parse_format0(name, frame),
                1 | 2 => Self::parse_format2(name, frame),
                3 => Self::parse_format3(name, frame),
                other => return Err(format!("unsupported metadata format {}", other)),
            };
            frames.push(parsed.ok_or_else(|| format!("frame '{}' is malformed", name))?);
        }

        Ok(Self {
            format,
            texture_file,
            frames,
        })
    }

    fn parse_format0(name: &str, frame: &PlistValue) -> Option<SpriteFrame> {
        let num = |key: &str| frame.get(key).and_then(PlistValue::as_f32);
        let width = num("width")?;
        let height = num("height")?;
        Some(SpriteFrame {
            name: name.to_string(),
            rect: FrameRect {
                x: num("x")?,
                y: num("y")?,
                width,
                height,
            },
            rotated: false,
            offset: [num("offsetX").unwrap_or(0.0), num("offsetY").unwrap_or(0.0)],
            original_size: [
                num("originalWidth").map(f32::abs).unwrap_or(width),
                num("originalHeight").map(f32::abs).unwrap_or(height),
            ],
            anchor: None,
        })
    }

    fn parse_format2(name: &str, frame: &PlistValue) -> Option<SpriteFrame> {
        let rect = parse_rect(frame.get("frame"))?;
        Some(SpriteFrame {
            name: name.to_string(),
            rect,
            rotated: frame.get("rotated").and_then(PlistValue::as_bool).unwrap_or(false),
            offset: parse_point(frame.get("offset")).unwrap_or([0.0, 0.0]),
            original_size: parse_point(frame.get("sourceSize")).unwrap_or([rect.width, rect.height]),
            anchor: None,
        })
    }

    fn parse_format3(name: &str, frame: &PlistValue) -> Option<SpriteFrame> {
        let rect = parse_rect(frame.get("textureRect"))?;
        Some(SpriteFrame {
            name: name.to_string(),
            rect,
            rotated: frame
                .get("textureRotated")
                .and_then(PlistValue::as_bool)
                .unwrap_or(false),
            offset: parse_point(frame.get("spriteOffset")).unwrap_or([0.0, 0.0]),
            original_size: parse_point(frame.get("spriteSourceSize"))
                .unwrap_or([rect.width, rect.height]),
            anchor: parse_point(frame.get("anchor")),
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

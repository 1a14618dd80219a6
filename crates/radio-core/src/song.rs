//! Now-playing metadata: the normalized [`Song`] record and the decoders that
//! turn a station's raw metadata response into one.
//!
//! Every station speaks its own format.  The decoder is chosen when the
//! station list is built (see [`SongFormat`]); nothing here inspects a body
//! to guess what it is.
//!
//! | format           | body                                                     |
//! |------------------|----------------------------------------------------------|
//! | `json`           | `{"Title": "...", "Artist": "..."}`                      |
//! | `delimited-json` | `{"currentTrack": "12 - Artist - Title"}`                |
//! | `xml-properties` | `<nowplaying-info><property name="cue_title">...`        |

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

// ── Public types ──────────────────────────────────────────────────────────────

/// What is playing right now.  Either field may be empty when the station
/// doesn't report it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Song {
    pub title: String,
    pub artist: String,
}

impl Song {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.artist.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid JSON metadata: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid XML metadata: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("track {track:?} has fewer than two usable parts")]
    MissingTokens { track: String },
}

/// Converts a raw metadata body into a [`Song`].
pub trait SongDecoder: Send + Sync {
    fn decode(&self, body: &[u8]) -> Result<Song, DecodeError>;
}

/// Wire format of a station's metadata endpoint, as written in the station
/// file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SongFormat {
    Json,
    DelimitedJson,
    XmlProperties,
}

impl SongFormat {
    pub fn decoder(self) -> Arc<dyn SongDecoder> {
        match self {
            Self::Json => Arc::new(StructuredJson),
            Self::DelimitedJson => Arc::new(DelimitedJson),
            Self::XmlProperties => Arc::new(XmlProperties),
        }
    }
}

// ── JSON ──────────────────────────────────────────────────────────────────────

/// `{"Title": ..., "Artist": ...}`, both keys required.
///
/// Keys match case-insensitively (`title`, `ARTIST`, ...); an exact match
/// wins over a case-folded one.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredJson;

impl SongDecoder for StructuredJson {
    fn decode(&self, body: &[u8]) -> Result<Song, DecodeError> {
        let object: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(body)?;
        Ok(Song {
            title: string_field(&object, "Title")?,
            artist: string_field(&object, "Artist")?,
        })
    }
}

fn string_field(
    object: &serde_json::Map<String, serde_json::Value>,
    key: &'static str,
) -> Result<String, DecodeError> {
    use serde::de::Error as _;

    let value = object.get(key).or_else(|| {
        object
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    });
    match value {
        Some(serde_json::Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(serde_json::Error::custom(format!(
            "field `{}` is not a string: {}",
            key, other
        ))
        .into()),
        None => Err(serde_json::Error::missing_field(key).into()),
    }
}

// ── Delimited JSON ────────────────────────────────────────────────────────────

const TRACK_SEPARATOR: &str = " - ";
const LIVE_MARKER: &str = "Ao Vivo";

/// `{"currentTrack": "Artist - Title"}` with track numbers and live markers
/// mixed into the string.
///
/// Parts that are plain integers or exactly `"Ao Vivo"` are dropped; of what
/// remains the first part is the artist and the second the title.
#[derive(Debug, Clone, Copy, Default)]
pub struct DelimitedJson;

#[derive(Deserialize)]
struct DelimitedBody {
    #[serde(rename = "currentTrack")]
    current_track: String,
}

impl SongDecoder for DelimitedJson {
    fn decode(&self, body: &[u8]) -> Result<Song, DecodeError> {
        let parsed: DelimitedBody = serde_json::from_slice(body)?;
        split_track(&parsed.current_track)
    }
}

fn split_track(track: &str) -> Result<Song, DecodeError> {
    let parts: Vec<&str> = track
        .split(TRACK_SEPARATOR)
        .filter(|part| part.parse::<i64>().is_err())
        .filter(|part| *part != LIVE_MARKER)
        .collect();

    match parts.as_slice() {
        [artist, title, ..] => Ok(Song::new(*title, *artist)),
        _ => Err(DecodeError::MissingTokens {
            track: track.to_string(),
        }),
    }
}

// ── XML properties ────────────────────────────────────────────────────────────

const ARTIST_PROPERTY: &str = "track_artist_name";
const TITLE_PROPERTY: &str = "cue_title";

/// Now-playing XML made of `<property name="...">` elements whose values sit
/// in CDATA sections.
///
/// All `track_artist_name` values are joined with `", "`; the first
/// `cue_title` is the title.  A document without either is an empty song,
/// not an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlProperties;

/// The document root.  Properties are usually wrapped in one or more
/// `nowplaying-info` entries; a bare `nowplaying-info` root is accepted too.
#[derive(Deserialize)]
struct NowPlayingDocument {
    #[serde(rename = "nowplaying-info", default)]
    entries: Vec<NowPlayingInfo>,
    #[serde(rename = "property", default)]
    properties: Vec<Property>,
}

#[derive(Deserialize)]
struct NowPlayingInfo {
    #[serde(rename = "property", default)]
    properties: Vec<Property>,
}

#[derive(Deserialize)]
struct Property {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "$text", default)]
    value: String,
}

impl SongDecoder for XmlProperties {
    fn decode(&self, body: &[u8]) -> Result<Song, DecodeError> {
        let doc: NowPlayingDocument = quick_xml::de::from_reader(body)?;
        let properties: Vec<Property> = doc
            .properties
            .into_iter()
            .chain(doc.entries.into_iter().flat_map(|e| e.properties))
            .collect();

        let artist = properties
            .iter()
            .filter(|p| p.name == ARTIST_PROPERTY)
            .map(|p| p.value.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let title = properties
            .iter()
            .find(|p| p.name == TITLE_PROPERTY)
            .map(|p| p.value.clone())
            .unwrap_or_default();

        Ok(Song { title, artist })
    }
}

// ── tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn triton(properties: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<nowplaying-info-list>
  <nowplaying-info mountName="MELODIAFMAAC" timestamp="1700000000" type="track">
    {}
  </nowplaying-info>
</nowplaying-info-list>"#,
            properties
        )
    }

    #[test]
    fn test_structured_json() {
        let song = StructuredJson
            .decode(br#"{"Title": "Oceans", "Artist": "Hillsong United"}"#)
            .unwrap();
        assert_eq!(song, Song::new("Oceans", "Hillsong United"));
    }

    #[test]
    fn test_structured_json_lowercase_keys() {
        let song = StructuredJson
            .decode(br#"{"title": "Oceans", "artist": "Hillsong United", "album": "Zion"}"#)
            .unwrap();
        assert_eq!(song.title, "Oceans");
    }

    #[test]
    fn test_structured_json_keys_any_case() {
        let song = StructuredJson
            .decode(br#"{"TITLE": "Oceans", "aRtIsT": "Hillsong United"}"#)
            .unwrap();
        assert_eq!(song, Song::new("Oceans", "Hillsong United"));
    }

    #[test]
    fn test_structured_json_exact_key_wins() {
        let song = StructuredJson
            .decode(br#"{"title": "lower", "Title": "exact", "Artist": "x"}"#)
            .unwrap();
        assert_eq!(song.title, "exact");
    }

    #[test]
    fn test_structured_json_missing_field() {
        let err = StructuredJson.decode(br#"{"Title": "Oceans"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
    }

    #[test]
    fn test_structured_json_wrong_type() {
        let err = StructuredJson
            .decode(br#"{"Title": 7, "Artist": "x"}"#)
            .unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
    }

    #[test]
    fn test_structured_json_not_json() {
        assert!(StructuredJson.decode(b"<html>502</html>").is_err());
    }

    #[test]
    fn test_delimited_drops_numbers_and_live_marker() {
        let song = DelimitedJson
            .decode(br#"{"currentTrack": "12 - Ao Vivo - Amazing Grace - Artist Name"}"#)
            .unwrap();
        // Positional: first survivor is the artist, second the title.
        assert_eq!(song.artist, "Amazing Grace");
        assert_eq!(song.title, "Artist Name");
    }

    #[test]
    fn test_delimited_plain_pair() {
        let song = DelimitedJson
            .decode(br#"{"currentTrack": "Aline Barros - Ressuscita-me"}"#)
            .unwrap();
        assert_eq!(song, Song::new("Ressuscita-me", "Aline Barros"));
    }

    #[test]
    fn test_delimited_extra_parts_ignored() {
        let song = split_track("Fernandinho - Uma Nova Historia - 2009 - Remaster").unwrap();
        assert_eq!(song, Song::new("Uma Nova Historia", "Fernandinho"));
    }

    #[test]
    fn test_delimited_only_live_marker_fails() {
        let err = DelimitedJson
            .decode(br#"{"currentTrack": "Ao Vivo"}"#)
            .unwrap_err();
        match err {
            DecodeError::MissingTokens { track } => assert_eq!(track, "Ao Vivo"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_delimited_single_part_fails() {
        assert!(matches!(
            split_track("07 - Intervalo"),
            Err(DecodeError::MissingTokens { .. })
        ));
        assert!(matches!(split_track(""), Err(DecodeError::MissingTokens { .. })));
    }

    #[test]
    fn test_delimited_missing_field() {
        let err = DelimitedJson.decode(br#"{"track": "a - b"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
    }

    #[test]
    fn test_xml_joins_artists_and_takes_first_title() {
        let body = triton(
            r#"<property name="cue_title"><![CDATA[Song X]]></property>
    <property name="track_artist_name"><![CDATA[A]]></property>
    <property name="cue_time_start"><![CDATA[1700000000000]]></property>
    <property name="track_artist_name"><![CDATA[B]]></property>
    <property name="cue_title"><![CDATA[Other]]></property>"#,
        );
        let song = XmlProperties.decode(body.as_bytes()).unwrap();
        assert_eq!(song.artist, "A, B");
        assert_eq!(song.title, "Song X");
    }

    #[test]
    fn test_xml_other_elements_between_properties() {
        let body = triton(
            r#"<property name="cue_title"><![CDATA[T]]></property>
    <extra/>
    <property name="track_artist_name"><![CDATA[A]]></property>"#,
        );
        let song = XmlProperties.decode(body.as_bytes()).unwrap();
        assert_eq!(song, Song::new("T", "A"));
    }

    #[test]
    fn test_xml_entries_split_by_other_elements() {
        let body = br#"<nowplaying-info-list>
  <nowplaying-info><property name="cue_title"><![CDATA[First]]></property></nowplaying-info>
  <mount-status>live</mount-status>
  <nowplaying-info><property name="track_artist_name"><![CDATA[B]]></property></nowplaying-info>
</nowplaying-info-list>"#;
        let song = XmlProperties.decode(body).unwrap();
        assert_eq!(song, Song::new("First", "B"));
    }

    #[test]
    fn test_xml_no_matching_properties() {
        let body = triton(r#"<property name="cue_time_duration"><![CDATA[215000]]></property>"#);
        let song = XmlProperties.decode(body.as_bytes()).unwrap();
        assert_eq!(song, Song::default());
    }

    #[test]
    fn test_xml_empty_list() {
        let song = XmlProperties
            .decode(b"<nowplaying-info-list></nowplaying-info-list>")
            .unwrap();
        assert!(song.is_empty());
    }

    #[test]
    fn test_xml_bare_nowplaying_root() {
        let body = br#"<nowplaying-info><property name="cue_title"><![CDATA[Solo]]></property></nowplaying-info>"#;
        let song = XmlProperties.decode(body).unwrap();
        assert_eq!(song.title, "Solo");
        assert_eq!(song.artist, "");
    }

    #[test]
    fn test_xml_malformed() {
        let body = br#"<nowplaying-info-list><nowplaying-info><property name="cue_title">x</nowplaying-info>"#;
        let err = XmlProperties.decode(body).unwrap_err();
        assert!(matches!(err, DecodeError::Xml(_)));
    }

    #[test]
    fn test_format_from_station_file_name() {
        #[derive(Deserialize)]
        struct Row {
            format: SongFormat,
        }
        let row: Row = toml::from_str(r#"format = "delimited-json""#).unwrap();
        assert_eq!(row.format, SongFormat::DelimitedJson);

        let song = row
            .format
            .decoder()
            .decode(br#"{"currentTrack": "A - B"}"#)
            .unwrap();
        assert_eq!(song, Song::new("B", "A"));
    }
}

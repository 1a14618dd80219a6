//! Stations and the now-playing fetch.
//!
//! A [`Station`] is fixed at startup: where to stream from and, optionally,
//! where to ask what's playing and how to read the answer.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;
use crate::song::{DecodeError, Song, SongDecoder, SongFormat};

// ── Station ───────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MetadataSource {
    pub endpoint: String,
    pub decoder: Arc<dyn SongDecoder>,
}

impl MetadataSource {
    pub fn new(endpoint: impl Into<String>, format: SongFormat) -> Self {
        Self {
            endpoint: endpoint.into(),
            decoder: format.decoder(),
        }
    }
}

impl fmt::Debug for MetadataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataSource")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct Station {
    pub name: String,
    /// Handed to the player as-is.
    pub stream: String,
    pub metadata: Option<MetadataSource>,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("metadata request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("metadata endpoint answered {0}")]
    Status(reqwest::StatusCode),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl Station {
    pub fn new(name: impl Into<String>, stream: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stream: stream.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, endpoint: impl Into<String>, format: SongFormat) -> Self {
        self.metadata = Some(MetadataSource::new(endpoint, format));
        self
    }

    /// One GET against the metadata endpoint, decoded with the station's
    /// decoder.  Stations without an endpoint report an empty song without
    /// touching the network.
    pub async fn fetch_current_song(&self, client: &reqwest::Client) -> Result<Song, FetchError> {
        let Some(source) = &self.metadata else {
            return Ok(Song::default());
        };

        debug!("[fetch] {}: GET {}", self.name, source.endpoint);
        let resp = client.get(&source.endpoint).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        let body = resp.bytes().await?;
        debug!("[fetch] {}: {} bytes", self.name, body.len());

        Ok(source.decoder.decode(&body)?)
    }
}

// ── Built-in catalogue ────────────────────────────────────────────────────────

/// Stations used when no station file is configured.
pub fn builtin_stations() -> Vec<Station> {
    vec![
        Station::new("Christian Rock", "https://listen.christianrock.net/stream/11/")
            .with_metadata("https://www.christianrock.net/iphonecrdn.php", SongFormat::Json),
        Station::new("Christian Hits", "https://listen.christianrock.net/stream/12/")
            .with_metadata("https://www.christianrock.net/iphonechdn.php", SongFormat::Json),
        Station::new("Christian Lo-fi", "https://www.youtube.com/embed/-YJmGR2tD0k"),
        Station::new("Gospel Mix", "https://servidor33-3.brlogic.com:8192/live").with_metadata(
            "https://d36nr0u3xmc4mm.cloudfront.net/index.php/api/streaming/status/8192/2e1cbe43529055ddda74868d2db9ae98/SV4BR",
            SongFormat::DelimitedJson,
        ),
        Station::new("Melodia", "https://14543.live.streamtheworld.com/MELODIAFMAAC.aac")
            .with_metadata(
                "https://np.tritondigital.com/public/nowplaying?mountName=MELODIAFMAAC&numberToFetch=1&eventType=track",
                SongFormat::XmlProperties,
            ),
    ]
}

// ── TOML station loader ───────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("cannot read station file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid station file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("station list is empty")]
    Empty,

    #[error("duplicate station name {0:?}")]
    DuplicateName(String),
}

/// Matches the `[[station]]` tables of the station file.
#[derive(Debug, serde::Deserialize)]
struct TomlStationFile {
    #[serde(default)]
    station: Vec<TomlStation>,
}

#[derive(Debug, serde::Deserialize)]
struct TomlStation {
    name: String,
    stream: String,
    #[serde(default)]
    metadata: Option<TomlMetadata>,
}

#[derive(Debug, serde::Deserialize)]
struct TomlMetadata {
    endpoint: String,
    format: SongFormat,
}

pub fn parse_stations_from_toml_str(content: &str) -> Result<Vec<Station>, CatalogError> {
    let file: TomlStationFile = toml::from_str(content)?;
    let stations: Vec<Station> = file
        .station
        .into_iter()
        .map(|s| Station {
            name: s.name,
            stream: s.stream,
            metadata: s.metadata.map(|m| MetadataSource::new(m.endpoint, m.format)),
        })
        .collect();
    validate(&stations)?;
    Ok(stations)
}

pub fn load_stations_from_toml(path: &Path) -> Result<Vec<Station>, CatalogError> {
    let content = std::fs::read_to_string(path)?;
    parse_stations_from_toml_str(&content)
}

/// The configured station file if it exists, the built-in list otherwise.
pub fn load_stations(config: &Config) -> Result<Vec<Station>, CatalogError> {
    let path = &config.stations.stations_toml;
    if path.exists() {
        let stations = load_stations_from_toml(path)?;
        info!("Loaded {} stations from {}", stations.len(), path.display());
        Ok(stations)
    } else {
        debug!("No station file at {}, using built-in list", path.display());
        Ok(builtin_stations())
    }
}

fn validate(stations: &[Station]) -> Result<(), CatalogError> {
    if stations.is_empty() {
        return Err(CatalogError::Empty);
    }
    let mut seen = HashSet::new();
    for s in stations {
        if !seen.insert(s.name.as_str()) {
            return Err(CatalogError::DuplicateName(s.name.clone()));
        }
    }
    Ok(())
}

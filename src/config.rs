//! Key-value configuration for the local archive and imagery source defaults.
//!
//! The configuration lives in `~/.config/stormsat/config.toml` and mirrors the layout the
//! download helper tooling uses, a single `[default]` table:
//!
//! ```toml
//! [default]
//! save_dir = "/data/goes"
//! satellite = "noaa-goes16"
//! product = "ABI-L1b-Rad"
//! domain = "F"
//! channel = 11
//! coastline_file = "/data/coastline/ne_110m_coastline.geojson"
//! ```
//!
//! A missing file is not an error, the built in defaults above (minus the coastline) apply.

use crate::{
    error::{StormSatError, StormSatResult},
    satellite::{Domain, GoesProduct, Product, Satellite},
};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GoesConfig {
    /// Root directory of the local download archive.
    pub save_dir: PathBuf,
    /// Satellite to pull imagery from, in bucket name form.
    pub satellite: String,
    /// ABI product name, without the domain suffix.
    pub product: String,
    /// Scan domain: "F", "C", "M1", or "M2".
    pub domain: String,
    /// ABI instrument channel (band), 1 through 16.
    pub channel: u8,
    /// Optional GeoJSON file with coastline geometry for the rendered overlay.
    pub coastline_file: Option<PathBuf>,
}

impl Default for GoesConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));

        GoesConfig {
            save_dir: home.join("data").join("goes"),
            satellite: "noaa-goes16".to_string(),
            product: "ABI-L1b-Rad".to_string(),
            domain: "F".to_string(),
            channel: 11,
            coastline_file: None,
        }
    }
}

/// The on-disk file wraps everything in a `[default]` table.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    default: GoesConfig,
}

impl GoesConfig {
    /// Load the configuration from the conventional location, falling back to defaults if the
    /// file does not exist.
    pub fn load() -> StormSatResult<Self> {
        let path = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stormsat")
            .join("config.toml");

        if path.is_file() {
            Self::load_from(&path)
        } else {
            Ok(GoesConfig::default())
        }
    }

    /// Load the configuration from an explicit path. The file must exist and parse.
    pub fn load_from<P: AsRef<Path>>(path: P) -> StormSatResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let file: ConfigFile = toml::from_str(&text)
            .map_err(|err| StormSatError::Configuration(err.to_string()))?;

        Ok(file.default)
    }

    /// Resolve the configured source strings into a typed imagery source.
    pub fn goes_product(&self) -> StormSatResult<GoesProduct> {
        if !(1..=16).contains(&self.channel) {
            return Err(StormSatError::Configuration(format!(
                "channel out of range: {}",
                self.channel
            )));
        }

        Ok(GoesProduct {
            satellite: Satellite::parse(&self.satellite)?,
            product: Product::parse(&self.product)?,
            domain: Domain::parse(&self.domain)?,
            channel: self.channel,
            mode: None,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_parses_the_default_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            concat!(
                "[default]\n",
                "save_dir = \"/data/goes\"\n",
                "satellite = \"noaa-goes16\"\n",
                "product = \"ABI-L1b-Rad\"\n",
                "domain = \"F\"\n",
                "channel = 13\n",
            )
        )
        .unwrap();

        let config = GoesConfig::load_from(&path).unwrap();
        assert_eq!(config.save_dir, PathBuf::from("/data/goes"));
        assert_eq!(config.channel, 13);
        assert!(config.coastline_file.is_none());

        let product = config.goes_product().unwrap();
        assert_eq!(product.satellite, Satellite::G16);
        assert_eq!(product.product, Product::AbiL1bRad);
        assert_eq!(product.domain, Domain::Full);
        assert_eq!(product.channel, 13);
    }

    #[test]
    fn test_partial_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        std::fs::write(&path, "[default]\nchannel = 2\n").unwrap();

        let config = GoesConfig::load_from(&path).unwrap();
        assert_eq!(config.channel, 2);
        assert_eq!(config.satellite, "noaa-goes16");
        assert_eq!(config.product, "ABI-L1b-Rad");
    }

    #[test]
    fn test_bad_channel_is_a_configuration_error() {
        let config = GoesConfig {
            channel: 42,
            ..GoesConfig::default()
        };

        assert!(matches!(
            config.goes_product(),
            Err(StormSatError::Configuration(_))
        ));
    }
}

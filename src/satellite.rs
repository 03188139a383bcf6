/*! Satellites, products, and the NOAA Big Data archive naming scheme. */

use crate::error::{StormSatError, StormSatResult};
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Timelike, Utc};

/** The GOES satellites this library works with. */
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::IntoStaticStr, strum::EnumIter)]
pub enum Satellite {
    /// GOES-16 (formerly GOES-R), or commonly known as GOES East
    G16,
    /// GOES-17 (formerly GOES-S), or commonly known as GOES West
    G17,
}

impl Satellite {
    /// The name of the public object storage bucket holding this satellite's archive.
    pub fn bucket(&self) -> &'static str {
        use Satellite::*;

        match self {
            G16 => "noaa-goes16",
            G17 => "noaa-goes17",
        }
    }

    /// Scan a string for something identifying a satellite.
    ///
    /// Accepts the short form used in archive file names ("G16") as well as the bucket style
    /// names used in configuration files ("noaa-goes16", "goes16", "16").
    pub fn parse(string: &str) -> StormSatResult<Satellite> {
        use Satellite::*;

        if string.contains("16") {
            Ok(G16)
        } else if string.contains("17") {
            Ok(G17)
        } else {
            Err(StormSatError::Configuration(format!(
                "unknown satellite: {}",
                string
            )))
        }
    }

    /// Get the date and time (in UTC) that the satellite became operational.
    ///
    /// This is the time that the satellite was officially declared operational after all checkouts
    /// and operational testing. It may have started sending data before this date, but it may not
    /// be trustworthy data.
    pub fn operational(&self) -> DateTime<Utc> {
        use Satellite::*;

        match self {
            G16 => Utc.with_ymd_and_hms(2017, 12, 18, 12, 0, 0).unwrap(),
            G17 => Utc.with_ymd_and_hms(2019, 2, 12, 12, 0, 0).unwrap(),
        }
    }
}

/** The ABI products this library recognizes. */
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::IntoStaticStr)]
pub enum Product {
    /// Level 1b radiances, raw instrument counts scaled to radiance.
    #[strum(serialize = "ABI-L1b-Rad")]
    AbiL1bRad,
    /// Level 2 cloud and moisture imagery, already converted to reflectance or brightness
    /// temperature.
    #[strum(serialize = "ABI-L2-CMIP")]
    AbiL2Cmip,
}

impl Product {
    pub fn name(&self) -> &'static str {
        (*self).into()
    }

    /// Scan a string for the occurrence of a product name.
    pub fn parse(string: &str) -> StormSatResult<Product> {
        use Product::*;

        for product in [AbiL1bRad, AbiL2Cmip] {
            if string.contains(product.name()) {
                return Ok(product);
            }
        }

        Err(StormSatError::Configuration(format!(
            "unknown product: {}",
            string
        )))
    }
}

/** The satellite scan domains this library recognizes. */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    /// The full disk domain that includes the full viewable disk of the Earth.
    Full,
    /// The Continental U.S. domain, which actually includes much of the U.S on both satellites.
    Conus,
    /// Meso-domain 1, a floating domain with 1 minute imagery updates.
    Meso1,
    /// Meso-domain 2, a floating domain with 1 minute imagery updates.
    Meso2,
}

impl Domain {
    /// The letter (plus meso number) appended to a product name in archive file names.
    pub fn name(&self) -> &'static str {
        use Domain::*;

        match self {
            Full => "F",
            Conus => "C",
            Meso1 => "M1",
            Meso2 => "M2",
        }
    }

    /// The suffix used in the archive directory structure.
    ///
    /// Both meso-domain files are stored in the same directory, so in paths the meso number is
    /// dropped and either domain is represented by a bare "M".
    pub fn path_suffix(&self) -> &'static str {
        use Domain::*;

        match self {
            Full => "F",
            Conus => "C",
            Meso1 | Meso2 => "M",
        }
    }

    pub fn parse(string: &str) -> StormSatResult<Domain> {
        use Domain::*;

        match string.trim() {
            "F" => Ok(Full),
            "C" => Ok(Conus),
            "M1" => Ok(Meso1),
            "M2" => Ok(Meso2),
            _ => Err(StormSatError::Configuration(format!(
                "unknown scan domain: {}",
                string
            ))),
        }
    }
}

/// A fully specified imagery source: satellite, product, domain, and instrument channel.
///
/// This is everything needed to build archive object keys and to decide whether an archive file
/// belongs to the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoesProduct {
    pub satellite: Satellite,
    pub product: Product,
    pub domain: Domain,
    /// The ABI instrument channel (band), 1 through 16.
    pub channel: u8,
    /// The scan mode. Most archive periods mix modes, so `None` matches any mode.
    pub mode: Option<u8>,
}

impl GoesProduct {
    /// The product directory name in the archive, e.g. "ABI-L1b-RadF".
    pub fn dir_name(&self) -> String {
        format!("{}{}", self.product.name(), self.domain.path_suffix())
    }

    /// The archive directory holding the files for an hour, e.g. "ABI-L1b-RadF/2017/298/12".
    pub fn hour_dir(&self, when: DateTime<Utc>) -> String {
        format!(
            "{}/{}/{:03}/{:02}",
            self.dir_name(),
            when.year(),
            when.ordinal(),
            when.hour()
        )
    }

    /// The object key prefix selecting this source's files for an hour.
    ///
    /// The scheme is fixed by the NOAA Big Data Project:
    /// `{product}/{year}/{day of year}/{hour}/OR_{product}-M{mode}C{channel}_*`. When no mode is
    /// pinned the prefix stops just before the mode digit and the channel is checked separately
    /// with [`GoesProduct::matches_file`].
    pub fn hour_prefix(&self, when: DateTime<Utc>) -> String {
        let mut prefix = format!("{}/OR_{}-M", self.hour_dir(when), self.dir_name());

        if let Some(mode) = self.mode {
            prefix.push_str(&format!("{}C{:02}", mode, self.channel));
        }

        prefix
    }

    /// Check whether an archive file name belongs to this source.
    pub fn matches_file(&self, file_name: &str) -> bool {
        let sector = format!("OR_{}{}-M", self.product.name(), self.domain.name());
        let channel = format!("C{:02}_", self.channel);

        file_name.contains(&sector) && file_name.contains(&channel)
    }
}

/// Parse the scan start time from an archive file name.
///
/// Archive file names carry the scan start in a `_sYYYYJJJHHMMSSt` token, where JJJ is the day of
/// the year and the trailing digit is tenths of a second (which is dropped here). For example
/// `OR_ABI-L1b-RadF-M6C11_G16_s20192441203204_e20192441212512_c20192441212583.nc` started its
/// scan on day 244 of 2019 at 12:03:20Z.
pub fn scan_start_time(file_name: &str) -> StormSatResult<DateTime<Utc>> {
    let bad_name = || StormSatError::FileName(file_name.to_string());

    let start = file_name.find("_s").ok_or_else(bad_name)? + 2;
    let digits = file_name.get(start..(start + 13)).ok_or_else(bad_name)?;

    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad_name());
    }

    let year: i32 = digits[0..4].parse().map_err(|_| bad_name())?;
    let doy: u32 = digits[4..7].parse().map_err(|_| bad_name())?;
    let hour: u32 = digits[7..9].parse().map_err(|_| bad_name())?;
    let minute: u32 = digits[9..11].parse().map_err(|_| bad_name())?;
    let second: u32 = digits[11..13].parse().map_err(|_| bad_name())?;

    let naive = NaiveDate::from_yo_opt(year, doy)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .ok_or_else(bad_name)?;

    Ok(Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod test {
    use super::*;

    fn radf_channel_11() -> GoesProduct {
        GoesProduct {
            satellite: Satellite::G16,
            product: Product::AbiL1bRad,
            domain: Domain::Full,
            channel: 11,
            mode: None,
        }
    }

    #[test]
    fn test_hour_prefix_matches_the_archive_scheme() {
        let when = Utc.with_ymd_and_hms(2017, 10, 25, 12, 0, 0).unwrap();
        assert_eq!(when.ordinal(), 298);

        let mut product = radf_channel_11();
        assert_eq!(
            product.hour_prefix(when),
            "ABI-L1b-RadF/2017/298/12/OR_ABI-L1b-RadF-M"
        );

        product.mode = Some(3);
        assert_eq!(
            product.hour_prefix(when),
            "ABI-L1b-RadF/2017/298/12/OR_ABI-L1b-RadF-M3C11"
        );

        // Days of the year below 100 are zero padded.
        let early = Utc.with_ymd_and_hms(2019, 2, 14, 3, 30, 0).unwrap();
        let prefix = radf_channel_11().hour_prefix(early);
        assert!(prefix.starts_with("ABI-L1b-RadF/2019/045/03/"));
    }

    #[test]
    fn test_matches_file_checks_sector_and_channel() {
        let product = radf_channel_11();

        assert!(product.matches_file("OR_ABI-L1b-RadF-M6C11_G16_s20192441203204_e20192441212512_c20192441212583.nc"));
        // Wrong channel
        assert!(!product.matches_file("OR_ABI-L1b-RadF-M6C13_G16_s20192441203204_e20192441212512_c20192441212583.nc"));
        // Wrong domain
        assert!(!product.matches_file("OR_ABI-L1b-RadC-M6C11_G16_s20192441203204_e20192441212512_c20192441212583.nc"));

        let meso = GoesProduct {
            domain: Domain::Meso1,
            ..product
        };
        assert!(meso.matches_file("OR_ABI-L1b-RadM1-M6C11_G16_s20192441203204_e20192441212512_c20192441212583.nc"));
        assert!(!meso.matches_file("OR_ABI-L1b-RadM2-M6C11_G16_s20192441203204_e20192441212512_c20192441212583.nc"));
    }

    #[test]
    fn test_scan_start_time() {
        let start = scan_start_time(
            "OR_ABI-L1b-RadF-M6C11_G16_s20192441203204_e20192441212512_c20192441212583.nc",
        )
        .unwrap();

        assert_eq!(start, Utc.with_ymd_and_hms(2019, 9, 1, 12, 3, 20).unwrap());
    }

    #[test]
    fn test_scan_start_time_rejects_malformed_names() {
        assert!(scan_start_time("no start token here.nc").is_err());
        assert!(scan_start_time("OR_ABI-L1b-RadF-M6C11_G16_sworm").is_err());
        assert!(scan_start_time("OR_ABI-L1b-RadF-M6C11_G16_s2019").is_err());
        // Day of the year out of range.
        assert!(scan_start_time("OR_ABI-L1b-RadF-M6C11_G16_s20194001203204_e.nc").is_err());
    }

    #[test]
    fn test_satellite_parse() {
        assert_eq!(Satellite::parse("noaa-goes16").unwrap(), Satellite::G16);
        assert_eq!(Satellite::parse("G17").unwrap(), Satellite::G17);
        assert!(Satellite::parse("noaa-goes99").is_err());
    }
}

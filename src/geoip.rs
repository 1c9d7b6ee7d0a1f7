//! GeoIP country database accessor.

use std::net::IpAddr;
use std::path::Path;

use maxminddb::MaxMindDBError;
use serde::Deserialize;

use crate::error::Result;

#[derive(Deserialize)]
struct Country {
    iso_code: Option<String>,
}

#[derive(Deserialize)]
struct CountryRecord {
    country: Option<Country>,
}

/// Country-level GeoIP database, opened once at startup and shared
/// read-only for the process lifetime.
pub struct GeoDb {
    reader: maxminddb::Reader<Vec<u8>>,
}

impl GeoDb {
    /// Open a MaxMind country database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let reader = maxminddb::Reader::open_readfile(path)?;
        Ok(Self { reader })
    }

    /// Look up the ISO country code for an IP address.
    ///
    /// `Ok(None)` means the database has a record for the address but no
    /// country code; an address absent from the database surfaces as an
    /// error, as do decode failures. Callers downgrade both to "no match".
    pub fn country(&self, ip: IpAddr) -> std::result::Result<Option<String>, MaxMindDBError> {
        let record: CountryRecord = self.reader.lookup(ip)?;
        Ok(record.country.and_then(|c| c.iso_code))
    }
}

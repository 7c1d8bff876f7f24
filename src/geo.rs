//! Geohash buckets and cache keys for nearby-event searches.
//!
//! Every path that addresses the search cache (read, write, and the catalog
//! query itself) goes through [`GeoKeyBuilder`] and [`effective_keyword`], so
//! two coordinates that fall into the same bucket always share one cache entry.

use serde::{Deserialize, Serialize};

/// Namespace shared by every search cache entry.
pub const CACHE_PREFIX: &str = "ticketmaster:events:";

const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeoError {
    #[error("geohash precision must be positive")]
    InvalidPrecision,
}

/// Encodes a coordinate as a geohash of `precision` characters.
///
/// Out-of-range coordinates are not rejected; they clamp to the outermost cell.
pub fn encode_geohash(coordinate: Coordinate, precision: usize) -> Result<String, GeoError> {
    if precision == 0 {
        return Err(GeoError::InvalidPrecision);
    }

    let (mut lat_lo, mut lat_hi) = (-90.0_f64, 90.0_f64);
    let (mut lon_lo, mut lon_hi) = (-180.0_f64, 180.0_f64);
    let mut hash = String::with_capacity(precision);
    let mut even_bit = true;

    while hash.len() < precision {
        let mut index = 0usize;
        for _ in 0..5 {
            // Bits alternate, longitude first.
            let (value, lo, hi) = if even_bit {
                (coordinate.longitude, &mut lon_lo, &mut lon_hi)
            } else {
                (coordinate.latitude, &mut lat_lo, &mut lat_hi)
            };
            let mid = (*lo + *hi) / 2.0;
            index <<= 1;
            if value >= mid {
                index |= 1;
                *lo = mid;
            } else {
                *hi = mid;
            }
            even_bit = !even_bit;
        }
        hash.push(BASE32[index] as char);
    }

    Ok(hash)
}

/// The keyword actually sent upstream and used in the cache key.
pub fn effective_keyword<'a>(keyword: Option<&'a str>, default_keyword: &'a str) -> &'a str {
    match keyword {
        Some(keyword) if !keyword.is_empty() => keyword,
        _ => default_keyword,
    }
}

/// Derives geohash buckets and search cache keys at a fixed precision.
#[derive(Debug, Clone)]
pub struct GeoKeyBuilder {
    precision: usize,
    default_keyword: String,
}

impl GeoKeyBuilder {
    pub fn new(precision: usize, default_keyword: impl Into<String>) -> Result<Self, GeoError> {
        if precision == 0 {
            return Err(GeoError::InvalidPrecision);
        }
        Ok(Self {
            precision,
            default_keyword: default_keyword.into(),
        })
    }

    pub fn bucket(&self, coordinate: Coordinate) -> String {
        // Precision was validated in `new`, so the encoder cannot fail here.
        encode_geohash(coordinate, self.precision).unwrap_or_default()
    }

    pub fn cache_key(&self, bucket: &str, keyword: Option<&str>) -> String {
        format!(
            "{CACHE_PREFIX}geo:{bucket}:kw:{}",
            effective_keyword(keyword, &self.default_keyword)
        )
    }
}

//! Duty roster records.
//!
//! A roster is the collection of pharmacies on duty for one schedule key.
//! Records arrive from an external ingestion pipeline and are stored as
//! JSON; the gateway returns them verbatim, so the payload fields here
//! mirror the stored shape exactly.

use serde::{Deserialize, Serialize};

use crate::coord::{CoordError, Coordinate};
use crate::proximity::Locatable;

/// One on-duty pharmacy as persisted in the roster store.
///
/// Coordinates are carried as the raw `lat`/`long` numbers the ingestion
/// pipeline wrote; use [`Pharmacy::locate`] to obtain a validated
/// coordinate for ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pharmacy {
    /// City the pharmacy is in.
    pub city: String,
    /// District within the city.
    pub district: String,
    /// Display name.
    pub name: String,
    /// Contact phone number, normalized by the ingestion pipeline.
    pub phone: String,
    /// Street address.
    pub address: String,
    /// Raw latitude in degrees.
    pub lat: f64,
    /// Raw longitude in degrees.
    pub long: f64,
}

impl Pharmacy {
    /// Validate the raw coordinates into a [`LocatedPharmacy`] usable by
    /// the proximity selector.
    ///
    /// # Errors
    ///
    /// Returns `CoordError` when the stored `lat`/`long` pair is out of
    /// range; callers ranking a roster typically skip such records.
    pub fn locate(self) -> Result<LocatedPharmacy, CoordError> {
        let location = Coordinate::new(self.lat, self.long)?;
        Ok(LocatedPharmacy {
            pharmacy: self,
            location,
        })
    }
}

/// A pharmacy with a validated ranking coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedPharmacy {
    /// The record as stored; passes through ranking untouched.
    pub pharmacy: Pharmacy,
    location: Coordinate,
}

impl LocatedPharmacy {
    /// The validated coordinate.
    pub fn location(&self) -> Coordinate {
        self.location
    }
}

impl Locatable for LocatedPharmacy {
    fn coordinate(&self) -> Coordinate {
        self.location
    }
}

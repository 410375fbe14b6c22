// Copyright (C) 2018  ParadoxSpiral
//
// This file is part of weathervane.
//
// Weathervane is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// Weathervane is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with Weathervane.  If not, see <http://www.gnu.org/licenses/>.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::blocking::Client;
use serde_derive::Deserialize;
use slog::{debug, Logger};

use crate::error::*;

pub const GOOGLE_GEOCODING_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Everything but the characters javascript's encodeURIComponent leaves alone
pub(crate) const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone, PartialEq)]
pub struct Geocode {
    pub latitude: f64,
    pub longitude: f64,
    /// The service's canonical name for the location, e.g. "Paris, France"
    pub address: String,
}

pub trait Geocoder: Send + Sync {
    /// `Ok(None)` if the service knows no such location
    fn geocode(&self, location: &str) -> Result<Option<Geocode>>;
}

// https://developers.google.com/maps/documentation/geocoding/requests-geocoding#GeocodingResponses
#[derive(Deserialize)]
struct GeocodeResponse {
    results: Vec<GeocodeResult>,
}

#[derive(Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
    formatted_address: String,
}

#[derive(Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

pub struct GoogleGeocoder {
    client: Client,
    url: String,
    key: String,
    log: Logger,
}

impl GoogleGeocoder {
    pub fn new(client: Client, url: String, key: String, log: Logger) -> GoogleGeocoder {
        GoogleGeocoder {
            client,
            url,
            key,
            log,
        }
    }

    fn request_url(&self, location: &str) -> String {
        format!(
            "{}?key={}&address={}",
            self.url,
            utf8_percent_encode(&self.key, COMPONENT),
            utf8_percent_encode(location, COMPONENT)
        )
    }
}

impl Geocoder for GoogleGeocoder {
    fn geocode(&self, location: &str) -> Result<Option<Geocode>> {
        debug!(self.log, "Geocoding {:?} via {}", location, self.url);
        let resp: GeocodeResponse = self
            .client
            .get(&self.request_url(location))
            .send()?
            .error_for_status()?
            .json()?;

        Ok(resp.results.into_iter().next().map(|r| Geocode {
            latitude: r.geometry.location.lat,
            longitude: r.geometry.location.lng,
            address: r.formatted_address,
        }))
    }
}

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

use lazy_static::lazy_static;
use percent_encoding::utf8_percent_encode;
use reqwest::blocking::Client;
use serde_derive::Deserialize;
use slog::{debug, Logger};

use std::collections::HashMap;

use super::geocode::COMPONENT;
use crate::error::*;

pub const DARKSKY_URL: &str = "https://api.darksky.net/forecast";

const BEARINGS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

lazy_static! {
    static ref EMOJIS: HashMap<&'static str, &'static str> = [
        ("clear-day", "☀️"),
        ("clear-night", "🌙"),
        ("rain", "🌦️"),
        ("snow", "❄️"),
        ("wind", "💨"),
        ("fog", "🌫️"),
        ("cloudy", "☁️"),
        ("partly-cloudy-day", "⛅"),
        ("partly-cloudy-night", "⛅"),
    ]
    .iter()
    .cloned()
    .collect();
}

// https://darksky.net/dev/docs/response
#[derive(Deserialize)]
struct ForecastResponse {
    currently: DataPoint,
}

// https://darksky.net/dev/docs/response#data-point
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DataPoint {
    pub summary: String,
    pub icon: String,
    /// °F
    pub temperature: f64,
    /// MPH
    #[serde(rename = "windSpeed")]
    pub wind_speed: f64,
    /// Degrees, 0 is north. Not sent if there is no wind
    #[serde(rename = "windBearing", default)]
    pub wind_bearing: Option<f64>,
    /// 0 to 1
    pub humidity: f64,
}

pub trait Forecaster: Send + Sync {
    /// The current conditions at the given coordinates
    fn currently(&self, latitude: f64, longitude: f64) -> Result<DataPoint>;
}

pub struct DarkSky {
    client: Client,
    url: String,
    key: String,
    log: Logger,
}

impl DarkSky {
    pub fn new(client: Client, url: String, key: String, log: Logger) -> DarkSky {
        DarkSky {
            client,
            url,
            key,
            log,
        }
    }

    fn request_url(&self, latitude: f64, longitude: f64) -> String {
        format!(
            "{}/{}/{},{}",
            self.url,
            utf8_percent_encode(&self.key, COMPONENT),
            latitude,
            longitude
        )
    }
}

impl Forecaster for DarkSky {
    fn currently(&self, latitude: f64, longitude: f64) -> Result<DataPoint> {
        debug!(
            self.log,
            "Fetching forecast for {},{} via {}", latitude, longitude, self.url
        );
        let resp: ForecastResponse = self
            .client
            .get(&self.request_url(latitude, longitude))
            .send()?
            .error_for_status()?
            .json()?;
        Ok(resp.currently)
    }
}

/// Eight compass points, each covering 45° centered on its direction. A bearing right between
/// two of them belongs to the one nearer to north.
pub fn bearing_to_cardinal(bearing: f64) -> &'static str {
    let bearing = bearing.rem_euclid(360.0);
    let sector = if bearing <= 180.0 {
        ((bearing - 22.5) / 45.0).ceil()
    } else {
        ((bearing + 22.5) / 45.0).floor()
    };
    BEARINGS[(sector as i64).rem_euclid(8) as usize]
}

#[inline]
pub fn icon_emoji(icon: &str) -> Option<&'static str> {
    EMOJIS.get(icon).cloned()
}

/// Renders e.g. `alice: ☀️ Clear in Paris, France (59F, wind E @ 5MPH, humidity 42%)`
pub fn format_report(requester: &str, address: &str, now: &DataPoint) -> String {
    let emoji = icon_emoji(&now.icon)
        .map(|e| format!("{} ", e))
        .unwrap_or_default();
    let direction = now.wind_bearing.map_or("calm", bearing_to_cardinal);

    format!(
        "{}: {}{} in {} ({}F, wind {} @ {}MPH, humidity {}%)",
        requester,
        emoji,
        now.summary,
        address,
        now.temperature.floor() as i64,
        direction,
        now.wind_speed,
        (now.humidity * 100.0).floor() as i64
    )
}

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

//! `.weather [location]`: current conditions for a location, which is remembered per channel and
//! nick so that a plain `.weather` works next time.

use reqwest::blocking::Client;
use slog::{error, info, o, trace, Logger};
use threadpool::ThreadPool;

use std::sync::Arc;

use crate::{
    config::Module as ModuleCfg,
    error::*,
    message::{reply_target, MessageContext},
    modules::Module,
    reply, DbPool,
};

pub mod forecast;
pub mod geocode;
pub mod location;

use self::{
    forecast::{Forecaster, DARKSKY_URL},
    geocode::{Geocoder, GOOGLE_GEOCODING_URL},
    location::LocationStore,
};
pub use self::{
    forecast::{bearing_to_cardinal, format_report, icon_emoji, DarkSky, DataPoint},
    geocode::{Geocode, GoogleGeocoder},
    location::SqliteLocations,
};

const DEFAULT_THREADS: usize = 4;

/// One `.weather` from start to finish: location, geocode, forecast, reply
#[derive(Clone)]
struct Lookup {
    log: Logger,
    store: Arc<dyn LocationStore>,
    geocoder: Arc<dyn Geocoder>,
    forecaster: Arc<dyn Forecaster>,
}

impl Lookup {
    fn run(&self, mctx: &MessageContext, channel: &str, nick: &str, args: &str) {
        let log = self
            .log
            .new(o!("channel" => channel.to_owned(), "nick" => nick.to_owned()));
        let bot_nick = mctx.nick();
        let target = reply_target(channel, nick, &bot_nick);

        let location = match location::resolve(&*self.store, &log, args, channel, nick) {
            Some(location) => location,
            None => return,
        };

        let geocode = match self.geocoder.geocode(&location) {
            Ok(Some(geocode)) => geocode,
            Ok(None) => {
                trace!(log, "No geocoding results for {:?}", location);
                reply!(mctx, target, "{}: Sorry, I couldn't find that location", nick);
                return;
            }
            Err(e) => {
                error!(log, "Failed to geocode {:?}: {}", location, e);
                return;
            }
        };

        match self
            .forecaster
            .currently(geocode.latitude, geocode.longitude)
        {
            Ok(now) => mctx.send(target, format_report(nick, &geocode.address, &now)),
            Err(e) => error!(log, "Failed to fetch forecast for {:?}: {}", geocode.address, e),
        }
    }
}

pub struct Weather {
    lookup: Lookup,
    workers: ThreadPool,
}

impl Weather {
    pub fn new(
        log: Logger,
        threads: usize,
        store: Arc<dyn LocationStore>,
        geocoder: Arc<dyn Geocoder>,
        forecaster: Arc<dyn Forecaster>,
    ) -> Weather {
        Weather {
            lookup: Lookup {
                log,
                store,
                geocoder,
                forecaster,
            },
            workers: ThreadPool::with_name("weather".to_owned(), threads),
        }
    }

    /// Sets up the location table, and the geocoding and weather services from the module's
    /// config, e.g.
    ///
    /// ```toml
    /// [[channel.module]]
    /// name = "weather"
    /// triggers = [".weather"]
    /// geocoding_key = "…" # else $GEOCODING_API_KEY
    /// darksky_key = "…"   # else $DARKSKY_API_KEY
    /// threads = 4
    /// ```
    pub fn from_config(log: Logger, db: &DbPool, cfg: &ModuleCfg) -> Result<Weather> {
        let locations = SqliteLocations::new(db.clone());
        locations.migrate()?;

        let client = Client::builder()
            .user_agent(concat!("weathervane/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let geocoder = GoogleGeocoder::new(
            client.clone(),
            cfg.field_str("geocoding_url")?
                .unwrap_or(GOOGLE_GEOCODING_URL)
                .to_owned(),
            cfg.secret("geocoding_key", "GEOCODING_API_KEY")?,
            log.clone(),
        );
        let darksky = DarkSky::new(
            client,
            cfg.field_str("forecast_url")?
                .unwrap_or(DARKSKY_URL)
                .to_owned(),
            cfg.secret("darksky_key", "DARKSKY_API_KEY")?,
            log.clone(),
        );
        let threads = cfg.field_usize("threads")?.unwrap_or(DEFAULT_THREADS);

        info!(log, "Weather module ready"; "threads" => threads);
        Ok(Weather::new(
            log,
            threads,
            Arc::new(locations),
            Arc::new(geocoder),
            Arc::new(darksky),
        ))
    }

    /// Answers one `.weather`, blocking until the reply is queued (or it was decided that there
    /// is no reply)
    #[inline]
    pub fn respond(&self, mctx: &MessageContext, channel: &str, nick: &str, args: &str) {
        self.lookup.run(mctx, channel, nick, args)
    }
}

impl Module for Weather {
    fn help(&self) -> &'static str {
        "'.weather [location]': current weather at location, or the last location you asked \
         about (Powered by Dark Sky)"
    }

    fn received(&mut self, mctx: &MessageContext, channel: &str, nick: &str, args: &str) {
        let (lookup, mctx) = (self.lookup.clone(), mctx.clone());
        let (channel, nick, args) = (channel.to_owned(), nick.to_owned(), args.to_owned());
        trace!(lookup.log, "Queueing .weather {:?} for {} in {}", args, nick, channel);
        self.workers
            .execute(move || lookup.run(&mctx, &channel, &nick, &args));
    }
}

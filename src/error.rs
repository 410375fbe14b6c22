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

use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// The builder was not given a config
    NoConfig,
    /// A module name occured more than once in the same channel, these need to be unique because
    /// they are used to dynamically load the correct module
    ModuleDuplicate,
    /// A module name could not be resolved to a module
    ModuleNotFound(String),
    /// A module trigger (aka a required prefix such as .weather) occured more than once
    TriggerDuplicate,
    /// An API key was neither configured nor found in the environment
    MissingKey(&'static str),
    /// A module specific config field had the wrong type
    InvalidField(&'static str),

    ConfigFormat(toml::de::Error),
    Sql(diesel::result::Error),
    Pool(diesel::r2d2::PoolError),
    Http(reqwest::Error),
    Io(std::io::Error),
    Irc(irc::error::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::NoConfig => write!(f, "no config provided"),
            Error::ModuleDuplicate => write!(f, "module configured twice in one channel"),
            Error::ModuleNotFound(name) => write!(f, "no module named {}", name),
            Error::TriggerDuplicate => write!(f, "trigger configured twice in one channel"),
            Error::MissingKey(key) => write!(f, "missing API key {}", key),
            Error::InvalidField(field) => write!(f, "invalid module field {}", field),
            Error::ConfigFormat(e) => write!(f, "config: {}", e),
            Error::Sql(e) => write!(f, "sql: {}", e),
            Error::Pool(e) => write!(f, "database pool: {}", e),
            Error::Http(e) => write!(f, "http: {}", e),
            Error::Io(e) => write!(f, "io: {}", e),
            Error::Irc(e) => write!(f, "irc: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<toml::de::Error> for Error {
    #[inline]
    fn from(e: toml::de::Error) -> Error {
        Error::ConfigFormat(e)
    }
}

impl From<std::io::Error> for Error {
    #[inline]
    fn from(e: std::io::Error) -> Error {
        Error::Io(e)
    }
}

impl From<diesel::result::Error> for Error {
    #[inline]
    fn from(e: diesel::result::Error) -> Error {
        Error::Sql(e)
    }
}

impl From<diesel::r2d2::PoolError> for Error {
    #[inline]
    fn from(e: diesel::r2d2::PoolError) -> Error {
        Error::Pool(e)
    }
}

impl From<reqwest::Error> for Error {
    #[inline]
    fn from(e: reqwest::Error) -> Error {
        Error::Http(e)
    }
}

impl From<irc::error::Error> for Error {
    #[inline]
    fn from(e: irc::error::Error) -> Error {
        Error::Irc(e)
    }
}

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

use irc::client::prelude::Config as IrcConfig;
use serde_derive::Deserialize;
use toml::{de, Value};

use std::{collections::HashMap, env, fs, path::Path};

use crate::error::*;

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub database: String,

    pub address: String,
    pub port: u16,
    #[serde(default = "default_true")]
    pub use_tls: bool,
    password: Option<String>,
    pub nick: String,
    nick_password: Option<String>,
    #[serde(default = "default_burst_messages")]
    pub max_burst_messages: u32,
    #[serde(default = "default_burst_window")]
    pub burst_window_length: u32,

    #[serde(rename = "channel")]
    pub channels: Vec<Channel>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct Channel {
    pub name: String,
    pub password: Option<String>,

    #[serde(rename = "module", default)]
    pub modules: Vec<Module>,
}

#[derive(Clone, Deserialize, Debug)]
pub struct Module {
    pub name: String,
    #[serde(default)]
    pub triggers: Vec<String>,

    /// Module specific settings, e.g. API keys
    #[serde(flatten)]
    pub fields: HashMap<String, Value>,
}

fn default_true() -> bool {
    true
}

fn default_burst_messages() -> u32 {
    4
}

fn default_burst_window() -> u32 {
    8
}

impl Config {
    #[inline]
    pub fn from_path<T: AsRef<Path>>(path: T) -> Result<Config> {
        Config::parse(&fs::read_to_string(path)?)
    }

    pub fn parse(s: &str) -> Result<Config> {
        let mut toml: Config = de::from_str(s)?;

        // Test if all modules have unique names, and unique triggers respectively
        if toml.channels.iter_mut().any(|c| {
            let n = c.modules.len();

            c.modules.sort_unstable_by(|m1, m2| m1.name.cmp(&m2.name));
            c.modules.dedup_by(|m1, m2| m1.name == m2.name);

            n != c.modules.len()
        }) {
            Err(Error::ModuleDuplicate)
        } else if toml.channels.iter().any(|c| {
            let mut triggers: Vec<&str> = c
                .modules
                .iter()
                .flat_map(|m| m.triggers.iter().map(|t| &**t))
                .collect();
            let l = triggers.len();

            triggers.sort_unstable();
            triggers.dedup();

            l != triggers.len()
        }) {
            Err(Error::TriggerDuplicate)
        } else {
            Ok(toml)
        }
    }

    #[inline]
    pub(crate) fn as_irc_config(&self) -> IrcConfig {
        IrcConfig {
            server: Some(self.address.clone()),
            port: Some(self.port),
            use_tls: Some(self.use_tls),

            nickname: Some(self.nick.clone()),
            nick_password: self.nick_password.clone(),
            password: self.password.clone(),

            max_messages_in_burst: Some(self.max_burst_messages),
            burst_window_length: Some(self.burst_window_length),

            channels: self.channels.iter().map(|c| c.name.clone()).collect(),
            channel_keys: self
                .channels
                .iter()
                .filter_map(|c| c.password.as_ref().map(|k| (c.name.clone(), k.clone())))
                .collect(),

            version: Some(format!(
                "Weathervane {} brought to you by {}",
                env!("CARGO_PKG_VERSION"),
                env!("CARGO_PKG_AUTHORS")
            )),

            ..Default::default()
        }
    }
}

impl Module {
    /// A string field, e.g. `darksky_key = "…"`
    pub fn field_str(&self, key: &'static str) -> Result<Option<&str>> {
        match self.fields.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(Error::InvalidField(key)),
        }
    }

    /// An integer field, e.g. `threads = 4`
    pub fn field_usize(&self, key: &'static str) -> Result<Option<usize>> {
        match self.fields.get(key) {
            None => Ok(None),
            Some(Value::Integer(i)) if *i > 0 => Ok(Some(*i as usize)),
            Some(_) => Err(Error::InvalidField(key)),
        }
    }

    /// A secret, read from the module's fields or else from the given environment variable
    pub fn secret(&self, key: &'static str, var: &'static str) -> Result<String> {
        if let Some(s) = self.field_str(key)? {
            Ok(s.to_owned())
        } else {
            env::var(var).map_err(|_| Error::MissingKey(key))
        }
    }
}

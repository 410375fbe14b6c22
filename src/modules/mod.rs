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

use slog::{o, Logger};

use std::collections::HashMap;

use crate::{config::Module as ModuleCfg, error::*, message::MessageContext, DbPool};

pub use self::weather::Weather;

pub mod weather;

/// Key: Channel name, module name. Value: Module configuration, Module pointer
pub type ModuleContext = HashMap<(String, String), (ModuleCfg, Box<dyn Module>)>;

pub trait Module: Send {
    fn help(&self) -> &'static str;

    /// Called when a PRIVMSG in `channel` by `nick` started with one of the module's triggers,
    /// `args` is what came after the trigger
    fn received(&mut self, mctx: &MessageContext, channel: &str, nick: &str, args: &str);
}

pub(crate) fn load_module(
    log: &Logger,
    db: &DbPool,
    cfg: &ModuleCfg,
) -> Result<Option<Box<dyn Module>>> {
    let log = log.new(o!("module" => cfg.name.clone()));
    match &*cfg.name {
        "weather" => Ok(Some(Box::new(Weather::from_config(log, db, cfg)?))),
        _ => Ok(None),
    }
}

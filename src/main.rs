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

use slog::{crit, info};
use tokio::runtime::Runtime;
use weathervane::prelude::*;

use std::{env, path::Path, process};

fn main() {
    // API keys may live in a .env file
    dotenv::dotenv().ok();
    let log = weathervane::logger();

    let path = env::args().nth(1).unwrap_or_else(|| {
        shellexpand::full("$XDG_CONFIG_HOME/weathervane/conf.toml")
            .unwrap_or_else(|_| shellexpand::tilde("~/.config/weathervane/conf.toml"))
            .into_owned()
    });
    info!(log, "Using config {}", path);

    let res = Builder::new()
        .with_logger(log.clone())
        .with_config_file(Path::new(&path))
        .build()
        .and_then(|mut bot| Runtime::new()?.block_on(bot.run()));

    if let Err(e) = res {
        crit!(log, "{}", e);
        // Flushes the async drain
        drop(log);
        process::exit(1);
    }
}

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

pub mod config;
pub mod error;
pub mod message;
pub mod models;
pub mod modules;
pub mod schema;
pub mod prelude {
    pub use crate::{
        config::{Config, Module as ModuleCfg},
        message::{reply_target, Message, MessageContext, SendMode},
        modules::Module,
        Bot, Builder, DbPool,
    };
    pub use std::sync::Arc;
}

use diesel::{
    connection::SimpleConnection,
    r2d2::{self, ConnectionManager, CustomizeConnection, Pool},
    sqlite::SqliteConnection,
};
use futures::prelude::*;
use irc::{client::Client, proto::Command};
use slog::{debug, error, info, o, trace, warn, Drain, Logger};

use std::path::Path;

use crate::{error::*, message::trigger_match, modules::ModuleContext, prelude::*};

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

/// Modules write from worker threads, wait for the lock instead of failing with SQLITE_BUSY
#[derive(Debug)]
struct BusyTimeout;

impl CustomizeConnection<SqliteConnection, r2d2::Error> for BusyTimeout {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), r2d2::Error> {
        conn.batch_execute("PRAGMA busy_timeout = 5000;")
            .map_err(r2d2::Error::QueryError)
    }
}

pub fn establish_pool(database: &str) -> Result<DbPool> {
    Ok(Pool::builder()
        .connection_customizer(Box::new(BusyTimeout))
        .build(ConnectionManager::<SqliteConnection>::new(database))?)
}

/// A terminal logger, drained on a background thread
pub fn logger() -> Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    Logger::root(drain, o!("version" => env!("CARGO_PKG_VERSION")))
}

enum ConfigKind<'p> {
    File(&'p Path),
    Parsed(Config),
}

pub struct Builder<'c> {
    config: Option<ConfigKind<'c>>,
    log: Option<Logger>,
}

impl<'c> Builder<'c> {
    #[inline]
    pub fn new() -> Builder<'c> {
        Builder {
            config: None,
            log: None,
        }
    }

    #[inline]
    pub fn with_config(self, config: Config) -> Self {
        Builder {
            config: Some(ConfigKind::Parsed(config)),
            log: self.log,
        }
    }

    #[inline]
    pub fn with_config_file(self, path: &'c Path) -> Self {
        Builder {
            config: Some(ConfigKind::File(path)),
            log: self.log,
        }
    }

    #[inline]
    pub fn with_logger(self, log: Logger) -> Self {
        Builder {
            config: self.config,
            log: Some(log),
        }
    }

    /// Loads the config, opens the database and sets up every configured module.
    ///
    /// Modules may create blocking HTTP clients, so this must not be called from within an
    /// async runtime.
    pub fn build(self) -> Result<Bot> {
        let config = match self.config {
            Some(ConfigKind::Parsed(c)) => c,
            Some(ConfigKind::File(p)) => Config::from_path(p)?,
            None => return Err(Error::NoConfig),
        };
        let log = self.log.unwrap_or_else(logger);

        let db = establish_pool(&config.database)?;
        debug!(log, "Opened database {}", config.database);

        let mut modules = ModuleContext::new();
        for channel in &config.channels {
            for cfg in &channel.modules {
                let module = modules::load_module(&log, &db, cfg)?
                    .ok_or_else(|| Error::ModuleNotFound(cfg.name.clone()))?;
                info!(log, "Loaded {} in {}", cfg.name, channel.name);

                modules.insert((channel.name.clone(), cfg.name.clone()), (cfg.clone(), module));
            }
        }

        Ok(Bot {
            config,
            log,
            modules,
        })
    }
}

impl<'c> Default for Builder<'c> {
    fn default() -> Self {
        Builder::new()
    }
}

pub struct Bot {
    config: Config,
    log: Logger,
    modules: ModuleContext,
}

impl Bot {
    /// Connects, and handles messages until the connection is closed
    pub async fn run(&mut self) -> Result<()> {
        let mut client = Client::from_config(self.config.as_irc_config()).await?;
        client.identify()?;
        let mut stream = client.stream()?;
        info!(self.log, "Connected to {}", self.config.address);

        // Deliver queued messages
        let (mctx, mut outgoing) = MessageContext::new(client.current_nickname());
        let sender = client.sender();
        let send_log = self.log.clone();
        tokio::spawn(async move {
            while let Some((msg, mode)) = outgoing.next().await {
                if let Err(e) = message::send(&sender, &msg, mode) {
                    error!(send_log, "Failed to send {:?}: {}", msg, e);
                }
            }
        });

        while let Some(msg) = stream.next().await.transpose()? {
            mctx.set_nick(client.current_nickname());
            dispatch(&self.log, &mctx, &mut self.modules, &msg);
        }

        warn!(self.log, "Disconnected from {}", self.config.address);
        Ok(())
    }
}

fn dispatch(log: &Logger, mctx: &MessageContext, modules: &mut ModuleContext, msg: &Message) {
    let (target, nick) = match (&msg.command, msg.source_nickname()) {
        (Command::PRIVMSG(target, _), Some(nick)) => (target, nick),
        _ => {
            trace!(log, "{:?}", msg);
            return;
        }
    };
    let private = *target == mctx.nick();

    match trigger_match(msg, &[".help"]) {
        // .help with no modules specified
        Some("") => {
            let mut names: Vec<&str> = modules
                .keys()
                .filter(|(chan, _)| private || chan == target)
                .map(|(_, name)| &**name)
                .collect();
            names.sort_unstable();
            names.dedup();
            mctx.send(nick, format!("Modules: {}", names.join(", ")));
        }
        // Other .help
        Some(topic) => {
            if let Some((_, module)) = modules
                .iter()
                .filter(|((chan, _), _)| private || chan == target)
                .map(|(_, m)| m)
                .find(|(cfg, _)| cfg.name == topic || cfg.triggers.iter().any(|t| t == topic))
            {
                mctx.send(nick, module.help().to_owned());
            } else {
                mctx.send(nick, "No module with that name found".to_owned());
            }
        }
        // Regular message
        None => {
            for ((chan, _), (cfg, module)) in modules.iter_mut() {
                if !private && chan != target {
                    continue;
                }
                if let Some(args) = trigger_match(msg, &cfg.triggers) {
                    trace!(log, "{} triggered {}", nick, cfg.name);
                    module.received(mctx, target, nick, args);
                    // Privately, every channel's modules are candidates, only answer once
                    if private {
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use irc::proto::Prefix;
    use parking_lot::Mutex;
    use slog::Discard;

    struct Recorder {
        calls: Arc<Mutex<Vec<(String, String, String)>>>,
    }

    impl Module for Recorder {
        fn help(&self) -> &'static str {
            "'.record': records"
        }

        fn received(&mut self, _: &MessageContext, channel: &str, nick: &str, args: &str) {
            self.calls
                .lock()
                .push((channel.to_owned(), nick.to_owned(), args.to_owned()));
        }
    }

    fn module_cfg(name: &str, trigger: &str) -> ModuleCfg {
        ModuleCfg {
            name: name.to_owned(),
            triggers: vec![trigger.to_owned()],
            fields: Default::default(),
        }
    }

    fn modules(
        calls: &Arc<Mutex<Vec<(String, String, String)>>>,
        channels: &[&str],
    ) -> ModuleContext {
        let mut modules = ModuleContext::new();
        for chan in channels {
            modules.insert(
                (chan.to_string(), "record".to_owned()),
                (
                    module_cfg("record", ".record"),
                    Box::new(Recorder {
                        calls: Arc::clone(calls),
                    }) as Box<dyn Module>,
                ),
            );
        }
        modules
    }

    fn privmsg(from: &str, target: &str, content: &str) -> Message {
        Message {
            tags: None,
            prefix: Some(Prefix::Nickname(
                from.to_owned(),
                from.to_owned(),
                "example.org".to_owned(),
            )),
            command: Command::PRIVMSG(target.to_owned(), content.to_owned()),
        }
    }

    fn sent(rx: &mut futures::channel::mpsc::UnboundedReceiver<message::Outgoing>) -> Vec<String> {
        let mut out = vec![];
        while let Ok(Some((msg, _))) = rx.try_next() {
            if let Command::PRIVMSG(target, content) = msg.command {
                out.push(format!("{} {}", target, content));
            }
        }
        out
    }

    #[test]
    fn dispatches_by_channel_and_trigger() {
        let log = Logger::root(Discard, o!());
        let calls = Arc::new(Mutex::new(vec![]));
        let mut modules = modules(&calls, &["#a"]);
        let (mctx, _rx) = MessageContext::new("vane");

        dispatch(&log, &mctx, &mut modules, &privmsg("alice", "#a", ".record  Paris"));
        dispatch(&log, &mctx, &mut modules, &privmsg("alice", "#b", ".record Oslo"));
        dispatch(&log, &mctx, &mut modules, &privmsg("alice", "#a", "hello"));

        assert_eq!(
            *calls.lock(),
            vec![("#a".to_owned(), "alice".to_owned(), "Paris".to_owned())]
        );
    }

    #[test]
    fn private_messages_trigger_once() {
        let log = Logger::root(Discard, o!());
        let calls = Arc::new(Mutex::new(vec![]));
        let mut modules = modules(&calls, &["#a", "#b"]);
        let (mctx, _rx) = MessageContext::new("vane");

        dispatch(&log, &mctx, &mut modules, &privmsg("alice", "vane", ".record"));

        assert_eq!(
            *calls.lock(),
            vec![("vane".to_owned(), "alice".to_owned(), String::new())]
        );
    }

    #[test]
    fn help() {
        let log = Logger::root(Discard, o!());
        let calls = Arc::new(Mutex::new(vec![]));
        let mut modules = modules(&calls, &["#a"]);
        let (mctx, mut rx) = MessageContext::new("vane");

        dispatch(&log, &mctx, &mut modules, &privmsg("alice", "#a", ".help"));
        dispatch(&log, &mctx, &mut modules, &privmsg("alice", "#a", ".help .record"));
        dispatch(&log, &mctx, &mut modules, &privmsg("alice", "#a", ".help nothing"));

        assert_eq!(
            sent(&mut rx),
            vec![
                "alice Modules: record",
                "alice '.record': records",
                "alice No module with that name found",
            ]
        );
        assert!(calls.lock().is_empty());
    }

    #[test]
    fn builds_configured_modules() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::parse(&format!(
            r##"
            database = "{}"
            address = "irc.example.org"
            port = 6697
            nick = "vane"

            [[channel]]
            name = "#weather"

            [[channel.module]]
            name = "weather"
            triggers = [".weather"]
            geocoding_key = "g"
            darksky_key = "d"
            "##,
            dir.path().join("bot.sqlite").display()
        ))
        .unwrap();

        let bot = Builder::new()
            .with_logger(Logger::root(Discard, o!()))
            .with_config(config)
            .build()
            .unwrap();
        assert!(bot
            .modules
            .contains_key(&("#weather".to_owned(), "weather".to_owned())));
    }

    #[test]
    fn unknown_module() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::parse(&format!(
            r##"
            database = "{}"
            address = "irc.example.org"
            port = 6697
            nick = "vane"

            [[channel]]
            name = "#weather"

            [[channel.module]]
            name = "horoscope"
            "##,
            dir.path().join("bot.sqlite").display()
        ))
        .unwrap();

        match Builder::new()
            .with_logger(Logger::root(Discard, o!()))
            .with_config(config)
            .build()
        {
            Err(Error::ModuleNotFound(name)) => assert_eq!(name, "horoscope"),
            Err(e) => panic!("{}", e),
            Ok(_) => panic!("horoscope module loaded"),
        }
    }
}

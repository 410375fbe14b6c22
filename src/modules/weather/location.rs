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

use diesel::{connection::SimpleConnection, prelude::*};
use slog::{error, trace, Logger};

use crate::{error::*, models::NewLocation, schema::weather::dsl, DbPool};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS weather (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        channel VARCHAR(256) NOT NULL,
        nick VARCHAR(256) NOT NULL,
        location VARCHAR(256) NOT NULL
    );
    CREATE UNIQUE INDEX IF NOT EXISTS channel_nick ON weather (channel, nick);
";

/// The last location a nick asked about, per channel
pub trait LocationStore: Send + Sync {
    fn find(&self, channel: &str, nick: &str) -> Result<Option<String>>;
    /// Insert if there is no location for `(channel, nick)` yet, overwrite it otherwise
    fn upsert(&self, channel: &str, nick: &str, location: &str) -> Result<()>;
}

pub struct SqliteLocations {
    db: DbPool,
}

impl SqliteLocations {
    #[inline]
    pub fn new(db: DbPool) -> SqliteLocations {
        SqliteLocations { db }
    }

    /// Creates the table if it does not exist yet
    pub fn migrate(&self) -> Result<()> {
        let mut conn = self.db.get()?;
        conn.batch_execute(SCHEMA)?;
        Ok(())
    }
}

impl LocationStore for SqliteLocations {
    fn find(&self, channel: &str, nick: &str) -> Result<Option<String>> {
        let mut conn = self.db.get()?;
        Ok(dsl::weather
            .filter(dsl::nick.eq(nick))
            .filter(dsl::channel.eq(channel))
            .select(dsl::location)
            .first::<String>(&mut *conn)
            .optional()?)
    }

    fn upsert(&self, channel: &str, nick: &str, location: &str) -> Result<()> {
        let mut conn = self.db.get()?;
        diesel::insert_into(dsl::weather)
            .values(&NewLocation {
                channel,
                nick,
                location,
            })
            .on_conflict((dsl::channel, dsl::nick))
            .do_update()
            .set(dsl::location.eq(location))
            .execute(&mut *conn)?;
        Ok(())
    }
}

/// Works out which location a `.weather <args>` should be about.
///
/// Non-empty `args` are remembered for `(channel, nick)` and used. Without `args` the remembered
/// location is used; if there is none the empty location is remembered and used, which won't
/// geocode.
///
/// Returns `None` if nothing should be replied at all, which is the case if looking up the
/// remembered location failed. A failure to remember a location is logged and otherwise ignored.
pub fn resolve(
    store: &dyn LocationStore,
    log: &Logger,
    args: &str,
    channel: &str,
    nick: &str,
) -> Option<String> {
    let location = args.split_whitespace().collect::<Vec<_>>().join(" ");

    if location.is_empty() {
        match store.find(channel, nick) {
            Ok(Some(stored)) => {
                trace!(log, "Using stored location {:?}", stored);
                return Some(stored);
            }
            Ok(None) => trace!(log, "No stored location"),
            Err(e) => {
                error!(log, "Failed to look up stored location: {}", e);
                return None;
            }
        }
    }

    if let Err(e) = store.upsert(channel, nick, &location) {
        error!(log, "Failed to store location {:?}: {}", location, e);
    }
    Some(location)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use parking_lot::Mutex;
    use slog::{o, Discard};

    use std::collections::HashMap;

    use crate::models::LocationRecord;

    pub(crate) fn test_logger() -> Logger {
        Logger::root(Discard, o!())
    }

    pub(crate) fn test_db() -> (DbPool, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weather.sqlite");
        let db = crate::establish_pool(path.to_str().unwrap()).unwrap();
        (db, dir)
    }

    fn records(db: &DbPool) -> Vec<LocationRecord> {
        let mut conn = db.get().unwrap();
        dsl::weather
            .order(dsl::id)
            .load::<LocationRecord>(&mut *conn)
            .unwrap()
    }

    /// Remembers locations in memory, and counts reads and writes
    #[derive(Default)]
    pub(crate) struct MemoryLocations {
        pub rows: Mutex<HashMap<(String, String), String>>,
        pub reads: Mutex<usize>,
        pub writes: Mutex<usize>,
    }

    impl LocationStore for MemoryLocations {
        fn find(&self, channel: &str, nick: &str) -> Result<Option<String>> {
            *self.reads.lock() += 1;
            Ok(self
                .rows
                .lock()
                .get(&(channel.to_owned(), nick.to_owned()))
                .cloned())
        }

        fn upsert(&self, channel: &str, nick: &str, location: &str) -> Result<()> {
            *self.writes.lock() += 1;
            self.rows
                .lock()
                .insert((channel.to_owned(), nick.to_owned()), location.to_owned());
            Ok(())
        }
    }

    /// Fails every query, like a database that went away
    pub(crate) struct BrokenLocations;

    impl LocationStore for BrokenLocations {
        fn find(&self, _: &str, _: &str) -> Result<Option<String>> {
            Err(Error::Sql(diesel::result::Error::BrokenTransactionManager))
        }

        fn upsert(&self, _: &str, _: &str, _: &str) -> Result<()> {
            Err(Error::Sql(diesel::result::Error::BrokenTransactionManager))
        }
    }

    #[test]
    fn migrate_is_idempotent() {
        let (db, _dir) = test_db();
        let store = SqliteLocations::new(db.clone());
        store.migrate().unwrap();
        store.upsert("#weather", "alice", "Paris").unwrap();
        store.migrate().unwrap();
        assert_eq!(
            store.find("#weather", "alice").unwrap(),
            Some("Paris".to_owned())
        );
    }

    #[test]
    fn upsert_inserts_then_overwrites() {
        let (db, _dir) = test_db();
        let store = SqliteLocations::new(db.clone());
        store.migrate().unwrap();

        store.upsert("#weather", "alice", "Paris").unwrap();
        store.upsert("#weather", "alice", "Berlin").unwrap();
        store.upsert("#other", "alice", "Oslo").unwrap();

        let rows = records(&db);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].channel, "#weather");
        assert_eq!(rows[0].nick, "alice");
        assert_eq!(rows[0].location, "Berlin");
        assert_eq!(rows[1].location, "Oslo");
    }

    #[test]
    fn find_is_per_channel_and_nick() {
        let (db, _dir) = test_db();
        let store = SqliteLocations::new(db);
        store.migrate().unwrap();
        store.upsert("#weather", "alice", "Paris").unwrap();

        assert_eq!(store.find("#weather", "bob").unwrap(), None);
        assert_eq!(store.find("#other", "alice").unwrap(), None);
    }

    #[test]
    fn explicit_location_is_stored() {
        let (db, _dir) = test_db();
        let store = SqliteLocations::new(db.clone());
        store.migrate().unwrap();
        let log = test_logger();

        for (args, expected) in &[
            ("Paris", "Paris"),
            ("  New   York ", "New York"),
            ("Paris", "Paris"),
        ] {
            assert_eq!(
                resolve(&store, &log, args, "#weather", "alice").as_ref().map(|l| &**l),
                Some(*expected)
            );
            assert_eq!(
                store.find("#weather", "alice").unwrap().as_ref().map(|l| &**l),
                Some(*expected)
            );
        }
        assert_eq!(records(&db).len(), 1);
    }

    #[test]
    fn stored_location_is_reused_without_writing() {
        let store = MemoryLocations::default();
        let log = test_logger();
        store.upsert("#weather", "alice", "Paris").unwrap();
        *store.writes.lock() = 0;

        assert_eq!(
            resolve(&store, &log, "   ", "#weather", "alice"),
            Some("Paris".to_owned())
        );
        assert_eq!(*store.reads.lock(), 1);
        assert_eq!(*store.writes.lock(), 0);
        assert_eq!(
            store.rows.lock().get(&("#weather".to_owned(), "alice".to_owned())),
            Some(&"Paris".to_owned())
        );
    }

    #[test]
    fn nothing_stored_remembers_empty_location() {
        let (db, _dir) = test_db();
        let store = SqliteLocations::new(db.clone());
        store.migrate().unwrap();
        let log = test_logger();

        assert_eq!(
            resolve(&store, &log, "", "#weather", "alice"),
            Some(String::new())
        );
        let rows = records(&db);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].location, "");
    }

    #[test]
    fn failed_write_still_resolves() {
        let log = test_logger();
        assert_eq!(
            resolve(&BrokenLocations, &log, "Paris", "#weather", "alice"),
            Some("Paris".to_owned())
        );
    }

    #[test]
    fn failed_read_resolves_nothing() {
        let log = test_logger();
        assert_eq!(resolve(&BrokenLocations, &log, "", "#weather", "alice"), None);
    }
}

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

use diesel::{Insertable, Queryable};

use crate::schema::weather;

#[derive(Debug, Queryable)]
pub struct LocationRecord {
    pub id: i64,
    pub channel: String,
    pub nick: String,
    pub location: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = weather)]
pub struct NewLocation<'a> {
    pub channel: &'a str,
    pub nick: &'a str,
    pub location: &'a str,
}

// Airbase
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Database abstraction to manipulate cities and their airports.

use crate::model::{AirportName, City, CityId, CityName};
#[cfg(feature = "postgres")]
use airbase_core::db::postgres;
#[cfg(any(feature = "sqlite", test))]
use airbase_core::db::sqlite;
use airbase_core::db::{DbError, DbResult, Executor, ensure_one_row};
use futures::TryStreamExt;
use sqlx::Row;
#[cfg(feature = "postgres")]
use sqlx::postgres::PgRow;
#[cfg(any(feature = "sqlite", test))]
use sqlx::sqlite::SqliteRow;


/// Initializes the database schema.
pub async fn init_schema(ex: &mut Executor) -> DbResult<()> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => postgres::run_schema(ex, include_str!("postgres.sql")).await,

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => sqlite::run_schema(ex, include_str!("sqlite.sql")).await,

        #[allow(unused)]
        _ => unreachable!(),
    }
}

#[cfg(feature = "postgres")]
impl TryFrom<PgRow> for City {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(postgres::map_sqlx_error)?;
        let city_name: String = row.try_get("city_name").map_err(postgres::map_sqlx_error)?;
        let airport_name: String = row.try_get("airport_name").map_err(postgres::map_sqlx_error)?;

        Ok(City::new(CityId::new(id), CityName::new(city_name)?, AirportName::new(airport_name)?))
    }
}

#[cfg(any(feature = "sqlite", test))]
impl TryFrom<SqliteRow> for City {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(sqlite::map_sqlx_error)?;
        let city_name: String = row.try_get("city_name").map_err(sqlite::map_sqlx_error)?;
        let airport_name: String = row.try_get("airport_name").map_err(sqlite::map_sqlx_error)?;

        Ok(City::new(CityId::new(id), CityName::new(city_name)?, AirportName::new(airport_name)?))
    }
}

/// Creates a new city named `city_name` served by the airport `airport_name`.
///
/// The identifier of the new city is assigned by the database.
pub(crate) async fn create_city(
    ex: &mut Executor,
    city_name: CityName,
    airport_name: AirportName,
) -> DbResult<City> {
    let id = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let sql = "INSERT INTO cities (city_name, airport_name) VALUES ($1, $2) RETURNING id";
            let row = sqlx::query(sql)
                .bind(city_name.as_str())
                .bind(airport_name.as_str())
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("id").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let sql = "INSERT INTO cities (city_name, airport_name) VALUES (?, ?)";
            let done = sqlx::query(sql)
                .bind(city_name.as_str())
                .bind(airport_name.as_str())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            ensure_one_row(done.rows_affected())?;
            done.last_insert_rowid()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    Ok(City::new(CityId::new(id), city_name, airport_name))
}

/// Gets all existing cities sorted by their identifier.
pub(crate) async fn get_cities(ex: &mut Executor) -> DbResult<Vec<City>> {
    let sql = "SELECT id, city_name, airport_name FROM cities ORDER BY id";

    let mut cities = vec![];
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let mut rows = sqlx::query(sql).fetch(ex.conn());
            while let Some(row) = rows.try_next().await.map_err(postgres::map_sqlx_error)? {
                cities.push(City::try_from(row)?);
            }
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let mut rows = sqlx::query(sql).fetch(ex.conn());
            while let Some(row) = rows.try_next().await.map_err(sqlite::map_sqlx_error)? {
                cities.push(City::try_from(row)?);
            }
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
    Ok(cities)
}

/// Gets the city identified by `id`.
pub(crate) async fn get_city(ex: &mut Executor, id: CityId) -> DbResult<City> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let sql = "SELECT id, city_name, airport_name FROM cities WHERE id = $1";
            let row = sqlx::query(sql)
                .bind(id.as_i64())
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            City::try_from(row)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let sql = "SELECT id, city_name, airport_name FROM cities WHERE id = ?";
            let row = sqlx::query(sql)
                .bind(id.as_i64())
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            City::try_from(row)
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Replaces the names of the existing city identified by `id`.
pub(crate) async fn update_city(
    ex: &mut Executor,
    id: CityId,
    city_name: CityName,
    airport_name: AirportName,
) -> DbResult<City> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let sql = "UPDATE cities SET city_name = $1, airport_name = $2 WHERE id = $3";
            let done = sqlx::query(sql)
                .bind(city_name.as_str())
                .bind(airport_name.as_str())
                .bind(id.as_i64())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let sql = "UPDATE cities SET city_name = ?, airport_name = ? WHERE id = ?";
            let done = sqlx::query(sql)
                .bind(city_name.as_str())
                .bind(airport_name.as_str())
                .bind(id.as_i64())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    ensure_one_row(rows_affected)?;
    Ok(City::new(id, city_name, airport_name))
}

/// Deletes the existing city identified by `id`.
pub(crate) async fn delete_city(ex: &mut Executor, id: CityId) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let done = sqlx::query("DELETE FROM cities WHERE id = $1")
                .bind(id.as_i64())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let done = sqlx::query("DELETE FROM cities WHERE id = ?")
                .bind(id.as_i64())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    ensure_one_row(rows_affected)
}

/// Counts the number of cities in the database.
#[cfg(test)]
pub(crate) async fn count_cities(ex: &mut Executor) -> DbResult<usize> {
    let count: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let row = sqlx::query("SELECT COUNT(*) AS count FROM cities")
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("count").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let row = sqlx::query("SELECT COUNT(*) AS count FROM cities")
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.try_get("count").map_err(sqlite::map_sqlx_error)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    usize::try_from(count)
        .map_err(|e| DbError::DataIntegrityError(format!("Invalid city count {}: {}", count, e)))
}

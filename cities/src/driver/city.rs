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

//! Operations on one city.

use crate::db;
use crate::driver::{Driver, map_city_error};
use crate::model::{AirportName, City, CityId, CityName};
use airbase_core::driver::DriverResult;

impl Driver {
    /// Deletes the existing city identified by `id`.
    pub(crate) async fn delete_city(self, id: CityId) -> DriverResult<()> {
        let what = "Failed to delete city";
        let mut tx = self.db.begin().await.map_err(|e| map_city_error(what, e))?;
        db::delete_city(tx.ex(), id).await.map_err(|e| map_city_error(what, e))?;
        tx.commit().await.map_err(|e| map_city_error(what, e))?;
        Ok(())
    }

    /// Gets the city identified by `id`.
    pub(crate) async fn get_city(self, id: CityId) -> DriverResult<City> {
        let what = "Failed to get city";
        let mut ex = self.db.ex().await.map_err(|e| map_city_error(what, e))?;
        let city = db::get_city(&mut ex, id).await.map_err(|e| map_city_error(what, e))?;
        Ok(city)
    }

    /// Replaces the names of the existing city identified by `id` with `city_name` and
    /// `airport_name`.
    pub(crate) async fn update_city(
        self,
        id: CityId,
        city_name: CityName,
        airport_name: AirportName,
    ) -> DriverResult<City> {
        let what = "Failed to update city";
        let mut tx = self.db.begin().await.map_err(|e| map_city_error(what, e))?;
        let city = db::update_city(tx.ex(), id, city_name, airport_name)
            .await
            .map_err(|e| map_city_error(what, e))?;
        tx.commit().await.map_err(|e| map_city_error(what, e))?;
        Ok(city)
    }
}

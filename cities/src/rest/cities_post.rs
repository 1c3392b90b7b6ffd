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

//! API to create a new city.

use crate::driver::Driver;
use crate::model::{AirportName, CityName};
use airbase_core::rest::RestError;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::{Json, http};
use serde::{Deserialize, Serialize};

/// Message sent to the server to create or update a city.
#[derive(Deserialize, Serialize)]
pub(crate) struct CityRequest {
    /// Name of the city.
    pub(crate) city_name: CityName,

    /// Name of the airport that serves the city.
    pub(crate) airport_name: AirportName,
}

/// POST handler for this API.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    Json(request): Json<CityRequest>,
) -> Result<impl IntoResponse, RestError> {
    let city = driver.create_city(request.city_name, request.airport_name).await?;
    Ok((http::StatusCode::CREATED, Json(city)))
}

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

//! API to delete a city.

use crate::driver::Driver;
use crate::model::CityId;
use airbase_core::rest::{EmptyBody, RestError};
use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
#[cfg(test)]
use serde::Deserialize;
use serde::Serialize;

/// Message returned by the server after deleting a city.
#[derive(Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub(crate) struct DeleteResponse {
    /// Human-readable confirmation of the deletion.
    pub(crate) message: String,
}

/// DELETE handler for this API.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    Path(id): Path<CityId>,
    _: EmptyBody,
) -> Result<impl IntoResponse, RestError> {
    driver.delete_city(id).await?;
    Ok(Json(DeleteResponse { message: "City deleted successfully".to_owned() }))
}

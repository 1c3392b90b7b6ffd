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

//! API to update an existing city.

use crate::driver::Driver;
use crate::model::CityId;
use crate::rest::cities_post::CityRequest;
use airbase_core::rest::RestError;
use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;

/// PUT handler for this API.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    Path(id): Path<CityId>,
    Json(request): Json<CityRequest>,
) -> Result<impl IntoResponse, RestError> {
    let city = driver.update_city(id, request.city_name, request.airport_name).await?;
    Ok(Json(city))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AirportName, City, CityName};
    use crate::rest::testutils::*;
    use airbase_core::rest::testutils::OneShotBuilder;
    use airbase_core::test_payload_must_be_json;
    use axum::http;
    use serde_json::json;

    fn route(id: i64) -> (http::Method, String) {
        (http::Method::PUT, format!("/cities/{}", id))
    }

    #[tokio::test]
    async fn test_ok() {
        let context = TestContext::setup().await;

        let city = context.create_city("Paris", "CDG").await;
        let other = context.create_city("Lisboa", "LIS").await;

        let request = CityRequest {
            city_name: CityName::from("Paris"),
            airport_name: AirportName::from("ORY"),
        };
        let response = OneShotBuilder::new(context.app(), route(city.id().as_i64()))
            .send_json(request)
            .await
            .expect_json::<City>()
            .await;
        let exp_city = City::new(city.id(), CityName::from("Paris"), AirportName::from("ORY"));
        assert_eq!(exp_city, response);

        assert_eq!(Some(&exp_city), context.get_city(city.id()).await.as_ref());
        assert_eq!(Some(&other), context.get_city(other.id()).await.as_ref());
    }

    #[tokio::test]
    async fn test_missing() {
        let context = TestContext::setup().await;

        let request = CityRequest {
            city_name: CityName::from("Paris"),
            airport_name: AirportName::from("ORY"),
        };
        OneShotBuilder::new(context.app(), route(1))
            .send_json(request)
            .await
            .expect_status(http::StatusCode::NOT_FOUND)
            .expect_error("^City not found$")
            .await;

        assert_eq!(0, context.count_cities().await);
    }

    #[tokio::test]
    async fn test_duplicate() {
        let context = TestContext::setup().await;

        let city1 = context.create_city("Paris", "CDG").await;
        let city2 = context.create_city("Lisboa", "LIS").await;

        let request = CityRequest {
            city_name: CityName::from("Lisboa"),
            airport_name: AirportName::from("CDG"),
        };
        OneShotBuilder::new(context.app(), route(city2.id().as_i64()))
            .send_json(request)
            .await
            .expect_status(http::StatusCode::BAD_REQUEST)
            .expect_error("City or airport already exists")
            .await;

        assert_eq!(Some(&city1), context.get_city(city1.id()).await.as_ref());
        assert_eq!(Some(&city2), context.get_city(city2.id()).await.as_ref());
    }

    #[tokio::test]
    async fn test_too_long_name() {
        let context = TestContext::setup().await;

        let city = context.create_city("Paris", "CDG").await;

        OneShotBuilder::new(context.app(), route(city.id().as_i64()))
            .send_json(json!({"city_name": "Paris", "airport_name": "x".repeat(257)}))
            .await
            .expect_status(http::StatusCode::UNPROCESSABLE_ENTITY)
            .expect_text("Airport name cannot be longer than 256 characters")
            .await;

        assert_eq!(Some(&city), context.get_city(city.id()).await.as_ref());
    }

    test_payload_must_be_json!(TestContext::setup().await.into_app(), route(1));
}

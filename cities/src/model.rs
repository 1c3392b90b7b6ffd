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

//! High-level data types.

use airbase_core::model::{ModelError, ModelResult};
use derive_getters::Getters;
use serde::de::Visitor;
use serde::{Deserialize, Serialize};

/// Maximum length of the names of cities and airports as specified in the schema.
const MAX_NAME_LENGTH: usize = 256;

/// Validates an untrusted name `s` describing a `what`.
fn validate_name(what: &str, s: String) -> ModelResult<String> {
    if s.trim().is_empty() {
        return Err(ModelError(format!("{} cannot be empty", what)));
    }
    if s.chars().count() > MAX_NAME_LENGTH {
        return Err(ModelError(format!(
            "{} cannot be longer than {} characters",
            what, MAX_NAME_LENGTH
        )));
    }
    Ok(s)
}

/// Generates a validated newtype for a name, along with its deserialization visitor.
macro_rules! name_type {
    ( $name:ident, $visitor:ident, $what:expr, $doc:expr ) => {
        #[doc = $doc]
        #[derive(Clone, Debug, Eq, PartialEq, Serialize)]
        #[serde(transparent)]
        pub(crate) struct $name(String);

        impl $name {
            /// Creates a new name from an untrusted string `s`, making sure it is valid.
            pub(crate) fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
                validate_name($what, s.into()).map(Self)
            }

            /// Returns a string view of the name.
            pub(crate) fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        #[cfg(test)]
        impl From<&'static str> for $name {
            /// Creates a new name from a hardcoded string, which must be valid.
            fn from(s: &'static str) -> Self {
                Self::new(s).expect("Hardcoded names must be valid")
            }
        }

        /// A deserialization visitor for the name type.
        struct $visitor;

        impl Visitor<'_> for $visitor {
            type Value = $name;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a string")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                $name::new(v).map_err(|e| E::custom(e.to_string()))
            }

            fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                $name::new(v).map_err(|e| E::custom(e.to_string()))
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                deserializer.deserialize_string($visitor)
            }
        }
    };
}

name_type!(CityName, CityNameVisitor, "City name", "The name of a city, unique across all cities.");
name_type!(
    AirportName,
    AirportNameVisitor,
    "Airport name",
    "The name of the airport serving a city, unique across all cities."
);

/// Identifier of a city as assigned by the database.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub(crate) struct CityId(i64);

impl CityId {
    /// Creates a new identifier from its raw database representation.
    pub(crate) fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw database representation of the identifier.
    pub(crate) fn as_i64(self) -> i64 {
        self.0
    }
}

/// A city and its airport.
#[derive(Debug, Getters, PartialEq, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub(crate) struct City {
    /// Identifier of the city.
    #[getter(copy)]
    id: CityId,

    /// Name of the city.
    city_name: CityName,

    /// Name of the airport that serves the city.
    airport_name: AirportName,
}

impl City {
    /// Creates a new city from its parts.
    pub(crate) fn new(id: CityId, city_name: CityName, airport_name: AirportName) -> Self {
        Self { id, city_name, airport_name }
    }
}

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

//! Typed access to the environment variables that configure a service.
//!
//! Services group their variables under a common prefix (such as `AIRBASE`) and each component
//! appends its own suffix to it (such as `PORT` or `PGSQL_HOST`).

use std::env;
use std::fmt::Display;
use std::str::FromStr;

/// Result type for this module.  Errors are human-readable descriptions of the problem.
pub type EnvResult<T> = Result<T, String>;

/// Computes the name of the variable `suffix` within the `prefix` namespace.
fn var_name(prefix: &str, suffix: &str) -> String {
    format!("{}_{}", prefix, suffix)
}

/// Reads the `<prefix>_<suffix>` variable and parses it as a `T`.
///
/// Returns `None` if the variable is not set.  Values that are set but cannot be parsed are
/// reported as errors instead of being silently ignored.
pub fn get_optional_var<T>(prefix: &str, suffix: &str) -> EnvResult<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    let name = var_name(prefix, suffix);
    let raw = match env::var(&name) {
        Ok(raw) => raw,
        Err(env::VarError::NotPresent) => return Ok(None),
        Err(env::VarError::NotUnicode(_)) => {
            return Err(format!("Environment variable {} is not valid UTF-8", name));
        }
    };
    raw.parse::<T>()
        .map(Some)
        .map_err(|e| format!("Invalid value '{}' in environment variable {}: {}", raw, name, e))
}

/// Reads the `<prefix>_<suffix>` variable and parses it as a `T`, failing if it is not set.
pub fn get_required_var<T>(prefix: &str, suffix: &str) -> EnvResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    get_optional_var(prefix, suffix)?.ok_or_else(|| {
        format!("Required environment variable {} not present", var_name(prefix, suffix))
    })
}

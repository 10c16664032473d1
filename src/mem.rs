// Copyright 2018 Andre-Philippe Paquet
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Parsing of human readable memory sizes such as `"100M"`.

use crate::error::{Error, Result};

/// Parses a memory size into a number of bytes.
///
/// The string is a decimal number, optionally fractional, followed by an optional case-insensitive
/// `k`, `m` or `g` suffix. Suffixes are powers of 1000, so `"100M"` is 100,000,000 bytes and
/// `"1.5k"` is 1,500 bytes.
///
/// ```
/// assert_eq!(recsort::parse_mem_string("100M").unwrap(), 100_000_000);
/// assert_eq!(recsort::parse_mem_string("512").unwrap(), 512);
/// assert!(recsort::parse_mem_string("lots").is_err());
/// ```
pub fn parse_mem_string(value: &str) -> Result<usize> {
    let trimmed = value.trim();
    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or_else(|| trimmed.len());
    let (number, suffix) = trimmed.split_at(split);

    let number: f64 = number
        .parse()
        .map_err(|_| invalid_mem_string(value))?;
    let multiplier = match suffix.to_ascii_lowercase().as_str() {
        "" => 1.0,
        "k" => 1e3,
        "m" => 1e6,
        "g" => 1e9,
        _ => return Err(invalid_mem_string(value)),
    };

    let bytes = (number * multiplier).floor();
    if !bytes.is_finite() || bytes < 1.0 || bytes > usize::MAX as f64 {
        return Err(invalid_mem_string(value));
    }

    Ok(bytes as usize)
}

fn invalid_mem_string(value: &str) -> Error {
    Error::Config(format!(
        "could not parse the memory string, expected positive number: {:?}",
        value
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffixes_are_decimal_and_case_insensitive() {
        assert_eq!(parse_mem_string("2k").unwrap(), 2_000);
        assert_eq!(parse_mem_string("2K").unwrap(), 2_000);
        assert_eq!(parse_mem_string("768m").unwrap(), 768_000_000);
        assert_eq!(parse_mem_string("1G").unwrap(), 1_000_000_000);
    }

    #[test]
    fn plain_and_fractional_numbers() {
        assert_eq!(parse_mem_string("4096").unwrap(), 4096);
        assert_eq!(parse_mem_string("1.5k").unwrap(), 1_500);
        assert_eq!(parse_mem_string(" 10M ").unwrap(), 10_000_000);
    }

    #[test]
    fn rejects_garbage() {
        for value in &["", "M", "abc", "10x", "10MB", "1.2.3k", "0", "0.0001k"] {
            match parse_mem_string(value) {
                Err(Error::Config(_)) => {}
                other => panic!("expected config error for {:?}, got {:?}", value, other),
            }
        }
    }
}

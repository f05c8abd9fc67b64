//! Output encodings for analysis and component results.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{de::DeserializeOwned, Serialize};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON with a trailing newline
    #[default]
    Json,
    /// MessagePack with named fields, so camelCase keys survive
    Msgpack,
}

impl OutputFormat {
    pub fn encode<T: Serialize>(self, value: &T) -> Result<Vec<u8>> {
        match self {
            OutputFormat::Json => {
                let mut buf = serde_json::to_vec_pretty(value).context("JSON encoding failed")?;
                buf.push(b'\n');
                Ok(buf)
            }
            OutputFormat::Msgpack => {
                rmp_serde::to_vec_named(value).context("MessagePack encoding failed")
            }
        }
    }

    pub fn decode<T: DeserializeOwned>(self, data: &[u8]) -> Result<T> {
        match self {
            OutputFormat::Json => serde_json::from_slice(data).context("JSON decoding failed"),
            OutputFormat::Msgpack => {
                rmp_serde::from_slice(data).context("MessagePack decoding failed")
            }
        }
    }
}

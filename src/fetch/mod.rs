// src/fetch/mod.rs

use crate::error::{Error, Result};
use reqwest::blocking::Client;
use std::io::{self, Write};
use tracing::debug;
use url::Url;

pub mod urls;
pub mod zips;

/// Performs the single GET behind a cache miss.
pub trait Transport {
    /// Stream the body at `url` into `sink`, returning the number of bytes
    /// written. Non-success statuses are errors.
    fn download(&self, url: &Url, sink: &mut dyn Write) -> Result<u64>;
}

impl Transport for Client {
    fn download(&self, url: &Url, sink: &mut dyn Write) -> Result<u64> {
        debug!(%url, "GET");
        let mut response = self
            .get(url.clone())
            .send()
            .map_err(|source| Error::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        io::copy(&mut response, sink).map_err(|source| Error::Body {
            url: url.to_string(),
            source,
        })
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn download(&self, url: &Url, sink: &mut dyn Write) -> Result<u64> {
        (**self).download(url, sink)
    }
}

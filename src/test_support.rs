//! Shared fixtures for the unit tests

use crate::{
    error::{Error, Result},
    fetch::Transport,
};
use std::{
    io::{Cursor, Write},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use url::Url;
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

pub const SAMPLE_CSV: &str = "REF_DATE,GEO,VALUE\n2020-01,Canada,100\n2020-02,Canada,101\n";

pub fn init_test_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,statscan=debug")),
        )
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// In-memory zip with the given `(name, content)` members, in order.
pub fn zip_bytes(members: &[(&str, &str)]) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut buf));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, content) in members {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
    buf
}

/// Transport that serves one canned response and panics when called more
/// often than allowed.
pub struct FakeTransport {
    response: std::result::Result<Vec<u8>, u16>,
    max_calls: usize,
    calls: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn ok(body: Vec<u8>, max_calls: usize) -> Self {
        Self {
            response: Ok(body),
            max_calls,
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            response: Err(status),
            max_calls: 1,
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        }
    }

    /// Transport that must never be used.
    pub fn offline() -> Self {
        Self::ok(Vec::new(), 0)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

impl Transport for FakeTransport {
    fn download(&self, url: &Url, sink: &mut dyn Write) -> Result<u64> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        assert!(
            n <= self.max_calls,
            "unexpected network call #{n} to {url} (allowed {})",
            self.max_calls
        );
        self.urls.lock().unwrap().push(url.to_string());
        match &self.response {
            Ok(body) => {
                sink.write_all(body).unwrap();
                Ok(body.len() as u64)
            }
            Err(status) => Err(Error::Status {
                url: url.to_string(),
                status: *status,
            }),
        }
    }
}

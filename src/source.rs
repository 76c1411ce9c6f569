//! Source opener (C1): resolves a local path or `http(s)` URL into a
//! sequential, non-seekable byte stream, transparently decompressing
//! `.json.gz`.
//!
//! The extension is read from the path component of the URL, after
//! stripping query string and fragment.

use std::fs::File;
use std::io::{BufReader, Read};
use std::time::Duration;

use flate2::read::MultiGzDecoder;
use tracing::{debug, warn};

use crate::error::ExtractError;

/// Where an MRF document (or a remote provider reference) lives.
#[derive(Debug, Clone)]
pub enum Location {
    Path(std::path::PathBuf),
    Url(String),
}

impl Location {
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            Location::Url(raw.to_owned())
        } else {
            Location::Path(std::path::PathBuf::from(raw))
        }
    }

    fn display(&self) -> String {
        match self {
            Location::Path(p) => p.display().to_string(),
            Location::Url(u) => u.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Plain,
    Gzip,
}

/// Strip query/fragment first, then match on the resulting path's suffix.
fn sniff_extension(location: &Location) -> Result<Encoding, ExtractError> {
    let path_part = match location {
        Location::Path(p) => p.to_string_lossy().to_string(),
        Location::Url(u) => {
            let without_fragment = u.split('#').next().unwrap_or(u);
            let without_query = without_fragment.split('?').next().unwrap_or(without_fragment);
            without_query.to_owned()
        }
    };

    if path_part.ends_with(".json.gz") {
        Ok(Encoding::Gzip)
    } else if path_part.ends_with(".json") {
        Ok(Encoding::Plain)
    } else {
        Err(ExtractError::InvalidSource {
            location: location.display(),
            reason: "expected a .json or .json.gz extension".to_owned(),
        })
    }
}

/// Retry/backoff policy for remote fetches.
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            max_retries: 3,
        }
    }
}

fn open_remote(
    url: &str,
    policy: &FetchPolicy,
) -> Result<reqwest::blocking::Response, ExtractError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(policy.timeout)
        .user_agent("mrf-extract/0.1")
        .build()
        .map_err(|e| ExtractError::InvalidSource {
            location: url.to_owned(),
            reason: format!("failed to build HTTP client: {e}"),
        })?;

    let mut attempt = 0;
    loop {
        debug!(url, attempt, "fetching remote MRF source");
        match client.get(url).send() {
            Ok(resp) if resp.status().is_success() => return Ok(resp),
            Ok(resp) if resp.status().is_server_error() && attempt < policy.max_retries => {
                warn!(url, status = %resp.status(), attempt, "server error, retrying");
                attempt += 1;
                std::thread::sleep(Duration::from_secs(2u64.pow(attempt)));
                continue;
            }
            Ok(resp) => {
                return Err(ExtractError::InvalidSource {
                    location: url.to_owned(),
                    reason: format!("HTTP error: {}", resp.status()),
                })
            }
            Err(e) if attempt < policy.max_retries => {
                warn!(url, error = %e, attempt, "request failed, retrying");
                attempt += 1;
                std::thread::sleep(Duration::from_secs(2u64.pow(attempt)));
                continue;
            }
            Err(e) => {
                return Err(ExtractError::InvalidSource {
                    location: url.to_owned(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

/// Open a [`Location`], returning a boxed, sequential `Read` over the
/// (already decompressed, if needed) JSON bytes.
///
/// The underlying HTTP response/decompressor is owned by the returned box
/// and released when it is dropped.
pub fn open(location: &Location, policy: &FetchPolicy) -> Result<Box<dyn Read>, ExtractError> {
    let encoding = sniff_extension(location)?;

    let raw: Box<dyn Read> = match location {
        Location::Path(path) => Box::new(BufReader::new(File::open(path)?)),
        Location::Url(url) => Box::new(BufReader::new(open_remote(url, policy)?)),
    };

    let mut stream: Box<dyn Read> = match encoding {
        Encoding::Plain => raw,
        Encoding::Gzip => Box::new(MultiGzDecoder::new(raw)),
    };

    // Verify the stream actually produces a first byte before handing it back.
    let mut probe = [0u8; 1];
    let n = stream.read(&mut probe).map_err(|e| ExtractError::InvalidSource {
        location: location.display(),
        reason: e.to_string(),
    })?;

    if n == 0 {
        return Ok(Box::new(std::io::Cursor::new(Vec::new())));
    }

    Ok(Box::new(std::io::Cursor::new(probe).chain(stream)))
}

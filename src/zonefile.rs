// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Whitelist zone file rewriting
//!
//! A whitelist zone is an ordinary BIND9 zone file whose records are all RPZ
//! passthru entries:
//!
//! ```text
//! $TTL 3600
//! @       IN      SOA     ns.example. admin.example. (
//!                         0000000042      ;Serial
//!                         3600 )
//! a.example.		CNAME	rpz-passthru.
//! ```
//!
//! Everything before the first passthru record is the header and is copied
//! verbatim, except for the serial which is bumped on every rewrite. Records are
//! matched on the text before their first tab.
//!
//! New content is committed by writing a temporary sibling file and renaming it
//! over the zone, so readers never see a partially written file.

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_till1},
    character::complete::{char, digit1, multispace0, not_line_ending, one_of, space0, space1},
    combinator::{eof, opt, recognize},
    multi::{many1, many_m_n},
    sequence::{pair, preceded, terminated, tuple},
    IResult,
};
use std::collections::HashSet;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::serial::{self, AllocatedSerial, SerialError, SerialNumber};
use crate::whitelist::{WhitelistAction, WhitelistRequest};

/// Fixed record type of whitelist records
pub const RECORD_TYPE: &str = "CNAME";

/// Fixed target of whitelist records
pub const RPZ_PASSTHRU: &str = "rpz-passthru.";

/// Zone file errors
#[derive(Debug, Error)]
pub enum ZoneFileError {
    #[error("Cannot open zone file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot write to zone file {path}: {source}")]
    Commit {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No ';Serial' line found in zone header")]
    SerialNotFound,

    #[error(transparent)]
    Serial(#[from] SerialError),
}

/// A whitelist (RPZ passthru) record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneRecord {
    pub domain: String,
}

impl ZoneRecord {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
        }
    }

    /// Zone file line for this record, including the trailing newline
    pub fn to_line(&self) -> String {
        format!("{}\t\t{}\t{}\n", self.domain, RECORD_TYPE, RPZ_PASSTHRU)
    }
}

/// Record class, only `IN` is meaningful for a whitelist zone
fn record_class(input: &str) -> IResult<&str, &str> {
    tag_no_case("IN")(input)
}

/// TTL in seconds or with BIND unit suffixes (`300`, `1h30m`)
fn record_ttl(input: &str) -> IResult<&str, &str> {
    recognize(many1(pair(digit1, opt(one_of("smhdwSMHDW")))))(input)
}

/// `domain<TAB>[ws][ttl ws][class ws]CNAME<ws>rpz-passthru.[ws][;comment]<eol>`
///
/// TTL and class may appear in either order.
fn passthru_record(input: &str) -> IResult<&str, &str> {
    let (input, domain) = take_till1(|c: char| c.is_whitespace())(input)?;
    let (input, _) = tuple((
        char('\t'),
        space0,
        many_m_n(0, 2, terminated(alt((record_class, record_ttl)), space1)),
        tag_no_case(RECORD_TYPE),
        space1,
        tag(RPZ_PASSTHRU),
        space0,
        opt(preceded(char(';'), not_line_ending)),
        multispace0,
        eof,
    ))(input)?;
    Ok((input, domain))
}

/// Parse a line as a whitelist record
pub fn parse_record(line: &str) -> Option<ZoneRecord> {
    passthru_record(line)
        .ok()
        .map(|(_, domain)| ZoneRecord::new(domain))
}

/// Domain field of a tab-delimited line: the text before the first tab
///
/// Returns `None` for lines without a tab and for continuation lines whose first
/// field is empty.
fn domain_field(line: &str) -> Option<&str> {
    let (domain, _) = line.split_once('\t')?;
    (!domain.is_empty()).then_some(domain)
}

/// Index of the first whitelist record; everything before it is header
fn record_region_start(lines: &[&str]) -> usize {
    lines
        .iter()
        .position(|line| parse_record(line).is_some())
        .unwrap_or(lines.len())
}

/// Outcome of rewriting a zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneRewrite {
    /// Complete new zone file content
    pub content: String,
    /// Serial before and after the rewrite
    pub serial: AllocatedSerial,
    /// Domains appended as new records
    pub added: Vec<String>,
    /// Domains whose records were dropped
    pub removed: Vec<String>,
    /// Requested domains that needed no change
    pub unchanged: Vec<String>,
    /// Number of records in the new zone
    pub records: usize,
}

/// Apply a whitelist request to zone file content
pub fn rewrite(content: &str, request: &WhitelistRequest) -> Result<ZoneRewrite, ZoneFileError> {
    let lines: Vec<&str> = content.split_inclusive('\n').collect();
    let header_end = record_region_start(&lines);

    let (header, allocated) = serial::next_serial(&lines[..header_end])?;
    let serial = allocated.ok_or(ZoneFileError::SerialNotFound)?;

    let mut out = String::with_capacity(content.len());
    for line in &header {
        out.push_str(line);
    }

    let mut pending: HashSet<&str> = request.domains().iter().map(String::as_str).collect();
    let mut removed: Vec<String> = Vec::new();
    let mut records = 0;

    for line in &lines[header_end..] {
        if let Some(domain) = domain_field(line) {
            if pending.contains(domain) {
                match request.action() {
                    WhitelistAction::Remove => {
                        if !removed.iter().any(|d| d == domain) {
                            removed.push(domain.to_string());
                        }
                        continue;
                    }
                    WhitelistAction::Add => {
                        pending.remove(domain);
                    }
                }
            }
            records += 1;
        }
        out.push_str(line);
    }

    let mut added = Vec::new();
    if request.action() == WhitelistAction::Add {
        for domain in request.domains() {
            if !pending.contains(domain.as_str()) {
                continue;
            }
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&ZoneRecord::new(domain.as_str()).to_line());
            added.push(domain.clone());
            records += 1;
        }
    }

    let unchanged = request
        .domains()
        .iter()
        .filter(|d| !added.contains(d) && !removed.contains(d))
        .cloned()
        .collect();

    Ok(ZoneRewrite {
        content: out,
        serial,
        added,
        removed,
        unchanged,
        records,
    })
}

/// Read-only view of a whitelist zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneSummary {
    pub serial: Option<SerialNumber>,
    pub domains: Vec<String>,
}

/// Serial and whitelisted domains of a zone
pub fn summarize(content: &str) -> Result<ZoneSummary, ZoneFileError> {
    let lines: Vec<&str> = content.split_inclusive('\n').collect();
    let header_end = record_region_start(&lines);

    let serial = serial::current_serial(lines[..header_end].iter().copied())?;
    let domains = lines[header_end..]
        .iter()
        .filter_map(|line| domain_field(line))
        .map(str::to_string)
        .collect();

    Ok(ZoneSummary { serial, domains })
}

/// Read a zone file
pub async fn read(path: &Path) -> Result<String, ZoneFileError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ZoneFileError::Read {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Temporary sibling used while committing `path` (`/zones/rpz.zone` -> `/zones/.rpz.zone.<pid>.tmp`)
fn temp_path(path: &Path) -> io::Result<PathBuf> {
    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("zone path {} has no file name", path.display()),
        )
    })?;

    let mut name = OsString::from(".");
    name.push(file_name);
    name.push(format!(".{}.tmp", std::process::id()));
    Ok(path.with_file_name(name))
}

/// Atomically replace the file at `path` with `content`
///
/// The content is written and synced to a temporary file in the same directory,
/// given the permissions of the file it replaces, then renamed over it.
pub async fn commit(path: &Path, content: &[u8]) -> io::Result<()> {
    let temp = temp_path(path)?;
    debug!("Committing {} via {}", path.display(), temp.display());

    let result = async {
        let mut file = tokio::fs::File::create(&temp).await?;
        file.write_all(content).await?;
        file.sync_all().await?;
        drop(file);

        if let Ok(metadata) = tokio::fs::metadata(path).await {
            tokio::fs::set_permissions(&temp, metadata.permissions()).await?;
        }

        tokio::fs::rename(&temp, path).await
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(&temp).await;
    }
    result
}

/// Write a rewrite to disk
pub async fn write(path: &Path, rewrite: &ZoneRewrite) -> Result<(), ZoneFileError> {
    commit(path, rewrite.content.as_bytes())
        .await
        .map_err(|e| ZoneFileError::Commit {
            path: path.to_path_buf(),
            source: e,
        })
}

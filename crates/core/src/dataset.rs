//! CSV and JSON boundaries between pipeline stages.
//!
//! Multi-valued columns (`genres`, `country`) are `Vec<String>` in memory and
//! `", "`-joined text on disk.

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

pub const LIST_SEPARATOR: &str = ", ";

/// Split a joined list column. Empty text yields an empty list.
pub fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

pub mod joined {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &[String], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&values.join(super::LIST_SEPARATOR))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(super::split_list).unwrap_or_default())
    }
}

pub fn read_records<R: std::io::Read, T: DeserializeOwned>(reader: R) -> anyhow::Result<Vec<T>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut out = Vec::new();
    for (idx, row) in rdr.deserialize::<T>().enumerate() {
        // Header is line 1.
        out.push(row.with_context(|| format!("invalid CSV row at line {}", idx + 2))?);
    }
    Ok(out)
}

pub fn write_records<W: std::io::Write, T: Serialize>(writer: W, rows: &[T]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row).context("serialize CSV row failed")?;
    }
    wtr.flush().context("flush CSV writer failed")?;
    Ok(())
}

pub fn read_csv<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("open input CSV failed: {}", path.display()))?;
    read_records(file).with_context(|| format!("read CSV failed: {}", path.display()))
}

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> anyhow::Result<()> {
    ensure_parent_dir(path)?;
    let file = std::fs::File::create(path)
        .with_context(|| format!("create output CSV failed: {}", path.display()))?;
    write_records(file, rows).with_context(|| format!("write CSV failed: {}", path.display()))
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    ensure_parent_dir(path)?;
    let body = serde_json::to_vec_pretty(value).context("serialize report JSON failed")?;
    std::fs::write(path, body).with_context(|| format!("write JSON failed: {}", path.display()))
}

fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create directory failed: {}", parent.display()))?;
    }
    Ok(())
}

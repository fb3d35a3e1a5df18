use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::store::{CollectionKey, Collections};

const MANIFEST_ENTRY: &str = "manifest.json";
pub const BUNDLE_FORMAT: &str = "feesd-collections-v1";
const BUNDLE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    format: String,
    version: u32,
    app_version: String,
    exported_at: String,
    collections: BTreeMap<String, EntryMeta>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntryMeta {
    entry: String,
    count: usize,
    sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub bundle_format: String,
    pub entry_count: usize,
    pub counts: BTreeMap<&'static str, usize>,
}

fn entry_name(key: CollectionKey) -> String {
    format!("collections/{}.json", key.as_str())
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn collection_bytes(collections: &Collections, key: CollectionKey) -> serde_json::Result<Vec<u8>> {
    match key {
        CollectionKey::Students => serde_json::to_vec_pretty(&collections.students),
        CollectionKey::Payments => serde_json::to_vec_pretty(&collections.payments),
        CollectionKey::Fees => serde_json::to_vec_pretty(&collections.fees),
    }
}

/// Write every collection as its own JSON entry plus a manifest of counts and checksums.
pub fn write_bundle(
    collections: &Collections,
    out_path: &Path,
    exported_at: DateTime<Utc>,
) -> anyhow::Result<ExportSummary> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }

    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entries = BTreeMap::new();
    let mut counts = BTreeMap::new();
    for key in CollectionKey::ALL {
        let name = entry_name(key);
        let bytes = collection_bytes(collections, key)
            .with_context(|| format!("failed to serialize {}", key.as_str()))?;
        zip.start_file(name.as_str(), opts)
            .with_context(|| format!("failed to start entry {}", name))?;
        zip.write_all(&bytes)
            .with_context(|| format!("failed to write entry {}", name))?;

        let count = collections.count(key);
        counts.insert(key.as_str(), count);
        entries.insert(
            key.as_str().to_string(),
            EntryMeta {
                entry: name,
                count,
                sha256: sha256_hex(&bytes),
            },
        );
    }

    let manifest = Manifest {
        format: BUNDLE_FORMAT.to_string(),
        version: BUNDLE_VERSION,
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        exported_at: exported_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        collections: entries,
    };
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    zip.finish().context("failed to finalize zip bundle")?;

    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT.to_string(),
        entry_count: CollectionKey::ALL.len() + 1,
        counts,
    })
}

fn read_entry<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> anyhow::Result<Vec<u8>> {
    let mut entry = archive
        .by_name(name)
        .with_context(|| format!("bundle missing {}", name))?;
    let mut bytes = Vec::new();
    entry
        .read_to_end(&mut bytes)
        .with_context(|| format!("failed to read {}", name))?;
    Ok(bytes)
}

fn decode_entry<T: DeserializeOwned, R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    key: CollectionKey,
    meta: &EntryMeta,
) -> anyhow::Result<Vec<T>> {
    let bytes = read_entry(archive, &meta.entry)?;
    let actual = sha256_hex(&bytes);
    if actual != meta.sha256.to_ascii_lowercase() {
        bail!(
            "{} checksum mismatch: expected {}, got {}",
            key.as_str(),
            meta.sha256,
            actual
        );
    }
    let items: Vec<T> = serde_json::from_slice(&bytes)
        .with_context(|| format!("{} entry is not a valid collection", key.as_str()))?;
    if items.len() != meta.count {
        bail!(
            "{} count mismatch: manifest says {}, entry has {}",
            key.as_str(),
            meta.count,
            items.len()
        );
    }
    Ok(items)
}

/// Read and check a bundle. Nothing is returned unless every collection matches the manifest.
pub fn read_bundle(in_path: &Path) -> anyhow::Result<Collections> {
    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let manifest_bytes = read_entry(&mut archive, MANIFEST_ENTRY)?;
    let manifest: serde_json::Value =
        serde_json::from_slice(&manifest_bytes).context("manifest.json is invalid JSON")?;
    let format = manifest
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if format != BUNDLE_FORMAT {
        bail!("unsupported bundle format: {}", format);
    }
    let manifest: Manifest =
        serde_json::from_value(manifest).context("manifest.json is incomplete")?;

    let mut entries: BTreeMap<&'static str, EntryMeta> = BTreeMap::new();
    for (name, meta) in manifest.collections {
        let key = CollectionKey::parse(&name)
            .ok_or_else(|| anyhow!("unknown collection in bundle: {}", name))?;
        entries.insert(key.as_str(), meta);
    }
    let meta = |key: CollectionKey| {
        entries
            .get(key.as_str())
            .ok_or_else(|| anyhow!("bundle has no {} collection", key.as_str()))
    };

    Ok(Collections {
        students: decode_entry(&mut archive, CollectionKey::Students, meta(CollectionKey::Students)?)?,
        payments: decode_entry(&mut archive, CollectionKey::Payments, meta(CollectionKey::Payments)?)?,
        fees: decode_entry(&mut archive, CollectionKey::Fees, meta(CollectionKey::Fees)?)?,
    })
}

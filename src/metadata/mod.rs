//! `MetadataBuilder` — derives a publishable metadata record from a file
//! path, its folder ordinal, and template configuration.

pub mod error;

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use ini::Ini;
use lazy_static::lazy_static;
use regex::bytes::Regex;
use serde::{Deserialize, Serialize};

pub use self::error::{Error, ErrorKind, Result};

/// Well-known per-folder override filename, consulted the same way the
/// main configuration file is parsed (INI, not the original tool's YAML).
pub const OVERRIDE_FILENAME: &str = ".bulkup-meta.ini";

const GPS_HEAD_SCAN_BYTES: u64 = 50 * 1024 * 1024;
const GPS_TAIL_SCAN_BYTES: u64 = 5 * 1024 * 1024;

lazy_static! {
    /// ISO-6709 fragment: `±DD.DDDD±DDD.DDDD(±AAA.AAA/)?`
    static ref GPS_PATTERN: Regex =
        Regex::new(r"([+-]\d+\.\d+)([+-]\d+\.\d+)(?:([+-]\d+\.?\d*)/)?").unwrap();
}

/// Template configuration consumed by `MetadataBuilder` (spec.md §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateConfig {
    pub title_template: String,
    pub description_template: String,
    pub tags: Vec<String>,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        TemplateConfig {
            title_template: "{stem}".into(),
            description_template: "{folder}\nNo. {index}/{total}\n\nFile: {filename}\nCaptured: {date}\n".into(),
            tags: Vec::new(),
        }
    }
}

/// The per-folder override file's contents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FolderOverride {
    pub title_template: Option<String>,
    pub description_template: Option<String>,
    pub tags: Option<Vec<String>>,
    pub extra_tags: Vec<String>,
}

impl FolderOverride {
    /// Loads the override file from `folder`, if present. Returns
    /// `Ok(None)` when there is no override file; logs and falls back to
    /// no override on a parse error rather than failing the whole build.
    pub fn load(folder: &Path) -> Result<Option<FolderOverride>> {
        let path = folder.join(OVERRIDE_FILENAME);
        if !path.exists() {
            return Ok(None);
        }

        let ini = match Ini::load_from_file(&path) {
            Ok(ini) => ini,
            Err(e) => {
                log::warn!("failed to read {:?}: {}", path, e);
                return Ok(None);
            }
        };

        let section = ini
            .section(None::<String>)
            .or_else(|| ini.section(Some("metadata")));
        let section = match section {
            Some(section) => section,
            None => return Ok(Some(FolderOverride::default())),
        };

        let tags = section
            .get("tags")
            .map(|s| split_tags(s));
        let extra_tags = section
            .get("extra_tags")
            .map(|s| split_tags(s))
            .unwrap_or_default();

        Ok(Some(FolderOverride {
            title_template: section.get("title_template").map(|s| s.to_string()),
            description_template: section.get("description_template").map(|s| s.to_string()),
            tags,
            extra_tags,
        }))
    }
}

fn split_tags(s: &str) -> Vec<String> {
    s.split(',').map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).collect()
}

/// Resolves the effective template config for `folder`: the base config
/// with any folder override applied (override wins on
/// `title_template`/`description_template`/`tags`; `extra_tags` append).
pub fn resolve_template_config(base: &TemplateConfig, folder: &Path) -> Result<TemplateConfig> {
    let mut resolved = base.clone();
    if let Some(over) = FolderOverride::load(folder)? {
        if let Some(t) = over.title_template {
            resolved.title_template = t;
        }
        if let Some(d) = over.description_template {
            resolved.description_template = d;
        }
        if let Some(tags) = over.tags {
            resolved.tags = tags;
        }
        for tag in over.extra_tags {
            if !resolved.tags.contains(&tag) {
                resolved.tags.push(tag);
            }
        }
    }
    Ok(resolved)
}

/// GPS coordinates, either extracted from container metadata or recovered
/// via the binary fallback scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gps {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
}

/// Container-level metadata supplied by the (out-of-scope) file metadata
/// extraction capability. `MetadataBuilder` falls back to a binary GPS scan
/// itself when `gps` is absent here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerMetadata {
    pub creation_date: Option<DateTime<Utc>>,
    pub gps: Option<Gps>,
}

/// The capability the Orchestrator depends on for container-level metadata
/// extraction (creation datetime, GPS) — out of this crate's scope per
/// spec.md §1 (a real implementation would shell out to `ffprobe` or read
/// QuickTime/Matroska atoms directly).
pub trait MetadataGenerator: Send + Sync {
    fn extract(&self, path: &Path) -> ContainerMetadata;
}

/// A `MetadataGenerator` that never recovers container metadata, leaving
/// `MetadataBuilder` to fall back entirely to its binary GPS scan and to
/// `"Unknown"`/empty date placeholders. Useful as a default when no real
/// extractor capability is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMetadataGenerator;

impl MetadataGenerator for NullMetadataGenerator {
    fn extract(&self, _path: &Path) -> ContainerMetadata {
        ContainerMetadata::default()
    }
}

/// The publishable metadata record produced by `MetadataBuilder::build`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub recording_date: Option<String>,
    pub location: Option<LocationRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
}

const TITLE_MAX_LEN: usize = 100;

/// Derives a publishable metadata record for `file_path`, the `index`-th
/// (1-based) file out of `total` in its folder.
pub fn build(
    file_path: &Path,
    index: usize,
    total: usize,
    template: &TemplateConfig,
    container: &ContainerMetadata,
) -> MetadataRecord {
    let folder_name = file_path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_string();
    let file_name = file_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_string();
    let stem = file_path
        .file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_string();

    let date_str = container
        .creation_date
        .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    let year_str = container
        .creation_date
        .map(|d| d.format("%Y").to_string())
        .unwrap_or_default();

    let mut vars = HashMap::new();
    vars.insert("folder", folder_name.clone());
    vars.insert("stem", stem.clone());
    vars.insert("filename", file_name.clone());
    vars.insert("date", date_str.clone());
    vars.insert("year", year_str.clone());
    vars.insert("index", index.to_string());
    vars.insert("total", total.to_string());

    let mut title = match expand_template(&template.title_template, &vars) {
        Ok(t) => t,
        Err(e) => {
            log::warn!("title template error: {}, falling back to default", e);
            format!("[{}] {}", folder_name, stem)
        }
    };
    if title.chars().count() > TITLE_MAX_LEN {
        title = title.chars().take(TITLE_MAX_LEN - 3).collect::<String>() + "...";
    }

    let description = match expand_template(&template.description_template, &vars) {
        Ok(d) => d,
        Err(e) => {
            log::warn!("description template error: {}, falling back to default", e);
            format!(
                "{folder}\nNo. {index}/{total}\n\nFile: {filename}\nCaptured: {date}\n",
                folder = folder_name,
                index = index,
                total = total,
                filename = file_name,
                date = date_str
            )
        }
    };

    let mut tags = template.tags.clone();
    if !folder_name.is_empty() && !tags.contains(&folder_name) {
        tags.push(folder_name);
    }
    if !year_str.is_empty() && !tags.contains(&year_str) {
        tags.push(year_str);
    }

    let recording_date = container.creation_date.map(|d| format!("{}Z", d.format("%Y-%m-%dT%H:%M:%S")));

    let gps = container.gps.or_else(|| scan_gps_from_bytes(file_path));
    let location = gps.map(|g| LocationRecord {
        latitude: g.latitude,
        longitude: g.longitude,
        altitude: g.altitude,
    });

    MetadataRecord {
        title,
        description,
        tags,
        recording_date,
        location,
    }
}

/// Expands `{placeholder}` references in `template` against `vars`. Returns
/// an error naming the first unknown placeholder encountered.
fn expand_template(template: &str, vars: &HashMap<&str, String>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let bytes = template.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' {
            let end = template[i..]
                .find('}')
                .map(|rel| i + rel)
                .ok_or_else(|| Error::template_expansion(template.to_string()))?;
            let key = &template[i + 1..end];
            let value = vars
                .get(key)
                .ok_or_else(|| Error::template_expansion(key.to_string()))?;
            out.push_str(value);
            i = end + 1;
        } else {
            let ch = template[i..].chars().next().unwrap();
            out.push(ch);
            i += ch.len_utf8();
        }
    }
    Ok(out)
}

/// Scans the first `GPS_HEAD_SCAN_BYTES` of `path`, then the trailing
/// `GPS_TAIL_SCAN_BYTES` if the file is larger, looking for an ISO-6709
/// coordinate fragment. Mirrors the original tool's binary-scan fallback.
fn scan_gps_from_bytes(path: &Path) -> Option<Gps> {
    let mut file = File::open(path).ok()?;
    let total_size = file.metadata().ok()?.len();

    let mut head = Vec::new();
    file.by_ref()
        .take(GPS_HEAD_SCAN_BYTES)
        .read_to_end(&mut head)
        .ok()?;
    if let Some(gps) = match_gps(&head) {
        return Some(gps);
    }

    if total_size > GPS_HEAD_SCAN_BYTES {
        let tail_start = total_size.saturating_sub(GPS_TAIL_SCAN_BYTES);
        file.seek(SeekFrom::Start(tail_start)).ok()?;
        let mut tail = Vec::new();
        file.read_to_end(&mut tail).ok()?;
        if let Some(gps) = match_gps(&tail) {
            return Some(gps);
        }
    }

    None
}

fn match_gps(data: &[u8]) -> Option<Gps> {
    let caps = GPS_PATTERN.captures(data)?;
    let lat: f64 = std::str::from_utf8(caps.get(1)?.as_bytes()).ok()?.parse().ok()?;
    let lon: f64 = std::str::from_utf8(caps.get(2)?.as_bytes()).ok()?.parse().ok()?;
    let alt = caps
        .get(3)
        .and_then(|m| std::str::from_utf8(m.as_bytes()).ok())
        .and_then(|s| s.parse().ok());
    Some(Gps {
        latitude: lat,
        longitude: lon,
        altitude: alt,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn template_expansion_substitutes_placeholders() {
        let mut vars = HashMap::new();
        vars.insert("stem", "sunset".to_string());
        vars.insert("folder", "Vacation".to_string());
        let out = expand_template("{stem} @ {folder}", &vars).unwrap();
        assert_eq!(out, "sunset @ Vacation");
    }

    #[test]
    fn template_expansion_errors_on_unknown_placeholder() {
        let vars = HashMap::new();
        assert!(expand_template("{nope}", &vars).is_err());
    }

    #[test]
    fn build_truncates_long_titles() {
        let template = TemplateConfig {
            title_template: "x".repeat(150),
            ..TemplateConfig::default()
        };
        let record = build(
            Path::new("/in/Vacation/clip.mp4"),
            1,
            1,
            &template,
            &ContainerMetadata::default(),
        );
        assert_eq!(record.title.chars().count(), 100);
        assert!(record.title.ends_with("..."));
    }

    #[test]
    fn build_adds_folder_and_year_tags() {
        let template = TemplateConfig::default();
        let container = ContainerMetadata {
            creation_date: Some(Utc.ymd(2023, 6, 1).and_hms(0, 0, 0)),
            gps: None,
        };
        let record = build(
            Path::new("/in/Vacation/sunset.mp4"),
            1,
            2,
            &template,
            &container,
        );
        assert!(record.tags.contains(&"Vacation".to_string()));
        assert!(record.tags.contains(&"2023".to_string()));
        assert_eq!(record.recording_date.as_deref(), Some("2023-06-01T00:00:00Z"));
    }

    #[test]
    fn override_merges_extra_tags_with_dedup() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(OVERRIDE_FILENAME),
            "title_template = {stem} @ {folder}\nextra_tags = beach, Vacation\n",
        )
        .unwrap();

        let base = TemplateConfig {
            tags: vec!["Vacation".to_string()],
            ..TemplateConfig::default()
        };
        let resolved = resolve_template_config(&base, dir.path()).unwrap();
        assert_eq!(resolved.title_template, "{stem} @ {folder}");
        assert_eq!(resolved.tags, vec!["Vacation".to_string(), "beach".to_string()]);
    }

    #[test]
    fn gps_scan_finds_iso6709_fragment_in_head() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"junkjunk+35.4524+139.6431/moretrailingbytes").unwrap();
        let gps = scan_gps_from_bytes(f.path()).unwrap();
        assert!((gps.latitude - 35.4524).abs() < 1e-9);
        assert!((gps.longitude - 139.6431).abs() < 1e-9);
    }

    #[test]
    fn gps_scan_returns_none_without_match() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"nothing interesting here").unwrap();
        assert!(scan_gps_from_bytes(f.path()).is_none());
    }
}

// In-memory zip assembly
//
// Output is reproducible: every entry uses the same compression level,
// the zip epoch (1980-01-01 00:00) as its modification time and 0644
// permissions, and entries are written in the order they are added. The
// archive only leaves this module once `finish` has written the central
// directory.

use crate::error::MediaResult;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

const COMPRESSION_LEVEL: i64 = 6;

/// One file to place in an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ArchiveEntry {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

pub struct ArchiveBuilder {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
    names: HashSet<String>,
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(COMPRESSION_LEVEL))
            .last_modified_time(DateTime::default())
            .unix_permissions(0o644);
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            options,
            names: HashSet::new(),
        }
    }

    /// Write one entry and return the name it was stored under.
    pub fn add(&mut self, name: &str, bytes: &[u8]) -> MediaResult<String> {
        let stored = self.unique_name(&normalize_entry_name(name));
        self.writer.start_file(stored.as_str(), self.options)?;
        self.writer.write_all(bytes)?;
        self.names.insert(stored.clone());
        Ok(stored)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Write the central directory and hand back the complete archive.
    pub fn finish(self) -> MediaResult<Vec<u8>> {
        let cursor = self.writer.finish()?;
        Ok(cursor.into_inner())
    }

    fn unique_name(&self, name: &str) -> String {
        if !self.names.contains(name) {
            return name.to_string();
        }
        let (dir, file) = match name.rfind('/') {
            Some(pos) => name.split_at(pos + 1),
            None => ("", name),
        };
        let (stem, ext) = match file.rfind('.') {
            Some(pos) if pos > 0 => file.split_at(pos),
            _ => (file, ""),
        };
        (1..)
            .map(|n| format!("{}{}({}){}", dir, stem, n, ext))
            .find(|candidate| !self.names.contains(candidate))
            .unwrap_or_else(|| name.to_string())
    }
}

/// Names that stay inside the extraction directory are kept verbatim, so
/// `build` round-trips them exactly. A name with a backslash, a `..`
/// component or an empty component (leading, trailing or doubled `/`) is
/// rewritten with `/` separators and those components dropped.
pub fn normalize_entry_name(name: &str) -> String {
    let unsafe_name =
        name.contains('\\') || name.split('/').any(|part| part.is_empty() || part == "..");
    if !unsafe_name {
        return name.to_string();
    }

    let cleaned = name.replace('\\', "/");
    let parts: Vec<&str> = cleaned
        .split('/')
        .filter(|part| !part.is_empty() && *part != "." && *part != "..")
        .collect();
    if parts.is_empty() {
        "unnamed".to_string()
    } else {
        parts.join("/")
    }
}

/// Assemble `entries` into a zip archive in the order given.
pub fn build<I>(entries: I) -> MediaResult<Vec<u8>>
where
    I: IntoIterator<Item = ArchiveEntry>,
{
    let mut builder = ArchiveBuilder::new();
    for entry in entries {
        builder.add(&entry.name, &entry.bytes)?;
    }
    tracing::debug!("Archive assembled with {} entries", builder.len());
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    fn read_back(bytes: Vec<u8>) -> Vec<(String, Vec<u8>)> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut file = archive.by_index(i).unwrap();
                let mut data = Vec::new();
                file.read_to_end(&mut data).unwrap();
                (file.name().to_string(), data)
            })
            .collect()
    }

    #[test]
    fn test_entries_round_trip_in_order() {
        let bytes = build(vec![
            ArchiveEntry::new("b.txt", b"second".to_vec()),
            ArchiveEntry::new("a.txt", b"first".to_vec()),
        ])
        .unwrap();
        let entries = read_back(bytes);
        assert_eq!(
            entries,
            vec![
                ("b.txt".to_string(), b"second".to_vec()),
                ("a.txt".to_string(), b"first".to_vec()),
            ]
        );
    }

    #[test]
    fn test_output_is_reproducible() {
        let entries = || {
            vec![
                ArchiveEntry::new("frame_00000_0.00s.png", vec![7u8; 4096]),
                ArchiveEntry::new("frame_00001_0.10s.png", vec![9u8; 100]),
            ]
        };
        assert_eq!(build(entries()).unwrap(), build(entries()).unwrap());
    }

    #[test]
    fn test_entries_are_deflated() {
        let bytes = build(vec![ArchiveEntry::new("x.bin", vec![0u8; 1024])]).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let file = archive.by_index(0).unwrap();
        assert_eq!(file.compression(), CompressionMethod::Deflated);
        assert!(file.compressed_size() < 1024);
    }

    #[test]
    fn test_colliding_names_get_suffixes() {
        let bytes = build(vec![
            ArchiveEntry::new("colorful/a.png", vec![1]),
            ArchiveEntry::new("colorful/a.png", vec![2]),
            ArchiveEntry::new("colorful/a.png", vec![3]),
            ArchiveEntry::new("README", vec![4]),
            ArchiveEntry::new("README", vec![5]),
        ])
        .unwrap();
        let names: Vec<String> = read_back(bytes).into_iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            vec![
                "colorful/a.png",
                "colorful/a(1).png",
                "colorful/a(2).png",
                "README",
                "README(1)",
            ]
        );
    }

    #[test]
    fn test_names_are_normalized() {
        assert_eq!(normalize_entry_name("..\\..\\etc/passwd"), "etc/passwd");
        assert_eq!(normalize_entry_name("/b&w/./photo.jpg"), "b&w/photo.jpg");
        assert_eq!(normalize_entry_name("../.."), "unnamed");
        assert_eq!(normalize_entry_name(".hidden"), ".hidden");
        assert_eq!(normalize_entry_name("a/"), "a");
        assert_eq!(normalize_entry_name(""), "unnamed");
    }

    #[test]
    fn test_safe_names_are_stored_verbatim() {
        for name in ["./x.png", "colorful/a b.jpg", "b&w/./photo.jpg", "frame_00000_0.00s.png"] {
            assert_eq!(normalize_entry_name(name), name);
        }

        let entries = vec![
            ArchiveEntry::new("./x.png", b"x".to_vec()),
            ArchiveEntry::new("dir/./y.png", b"y".to_vec()),
        ];
        let unpacked = read_back(build(entries.clone()).unwrap());
        let expected: Vec<(String, Vec<u8>)> =
            entries.into_iter().map(|e| (e.name, e.bytes)).collect();
        assert_eq!(unpacked, expected);
    }

    #[test]
    fn test_empty_archive_is_valid() {
        let bytes = build(Vec::<ArchiveEntry>::new()).unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 0);
    }
}

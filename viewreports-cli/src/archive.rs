//! Output archive: every artifact of a run in one deflate-compressed zip

use std::collections::HashSet;
use std::io::{Cursor, Write};

use anyhow::{Context, Result, bail};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// One named file destined for the archive
#[derive(Debug, Clone)]
pub struct Artifact {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Pack artifacts into a zip, in the given order
///
/// Entry names must be unique.
pub fn build_archive(artifacts: &[Artifact]) -> Result<Vec<u8>> {
    let mut seen = HashSet::new();
    for artifact in artifacts {
        if !seen.insert(artifact.name.as_str()) {
            bail!("Duplicate archive entry: {}", artifact.name);
        }
    }

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    for artifact in artifacts {
        zip.start_file(artifact.name.as_str(), options)
            .with_context(|| format!("Failed to add {} to archive", artifact.name))?;
        zip.write_all(&artifact.bytes)
            .with_context(|| format!("Failed to write {} to archive", artifact.name))?;
        log::debug!("Archived {} ({} bytes)", artifact.name, artifact.bytes.len());
    }

    let cursor = zip.finish().context("Failed to finish output archive")?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    #[test]
    fn test_entries_in_order_and_deflated() {
        let artifacts = vec![
            Artifact::new("template_a.xlsx", b"first".to_vec()),
            Artifact::new("cleaned_a.csv", b"name,views\n".to_vec()),
        ];
        let bytes = build_archive(&artifacts).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);

        let mut first = archive.by_index(0).unwrap();
        assert_eq!(first.name(), "template_a.xlsx");
        assert_eq!(first.compression(), CompressionMethod::Deflated);
        let mut content = String::new();
        first.read_to_string(&mut content).unwrap();
        assert_eq!(content, "first");
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let artifacts = vec![
            Artifact::new("a.xlsx", Vec::new()),
            Artifact::new("a.xlsx", Vec::new()),
        ];
        assert!(build_archive(&artifacts).is_err());
    }

    #[test]
    fn test_empty_archive_is_valid() {
        let bytes = build_archive(&[]).unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 0);
    }
}

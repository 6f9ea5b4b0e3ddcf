use std::io::{Cursor, Read};
use thiserror::Error;
use zip::ZipArchive;

/// One file pulled out of an uploaded archive, in archive order.
#[derive(Debug)]
pub struct ArchiveEntry {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("malformed zip archive: {0}")]
    Malformed(#[from] zip::result::ZipError),
    #[error("truncated archive entry: {0}")]
    Truncated(#[from] std::io::Error),
}

/// Parses an uploaded request body as a zip archive. Directory entries are
/// skipped; file entries come back with their original name and raw bytes.
pub fn read_archive(bytes: &[u8]) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        let name = file.name().to_string();
        let mut bytes = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut bytes)?;
        entries.push(ArchiveEntry { name, bytes });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn build_zip(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        writer.add_directory("holiday/", options).unwrap();
        for (name, bytes) in files {
            writer.start_file(*name, options).unwrap();
            writer.write_all(bytes).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn reads_file_entries_in_order() {
        let zipped = build_zip(&[("a.jpg", b"aaa"), ("b.png", b"bbbb")]);
        let entries = read_archive(&zipped).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a.jpg");
        assert_eq!(entries[0].bytes, b"aaa");
        assert_eq!(entries[1].name, "b.png");
        assert_eq!(entries[1].bytes, b"bbbb");
    }

    #[test]
    fn directory_entries_are_skipped() {
        let zipped = build_zip(&[("beach.jpg", b"pixels")]);
        let entries = read_archive(&zipped).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "beach.jpg");
    }

    #[test]
    fn rejects_non_zip_bytes() {
        let err = read_archive(b"definitely not a zip").unwrap_err();
        assert!(matches!(err, ArchiveError::Malformed(_)));
    }

    #[test]
    fn empty_archive_yields_no_entries() {
        let writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let zipped = writer.finish().unwrap().into_inner();
        let entries = read_archive(&zipped).unwrap();
        assert!(entries.is_empty());
    }
}

//! Facilities for discovering corpus files and dividing them into byte-range chunks.

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use log::debug;
use memchr::{memchr, memchr2, memchr3};
use walkdir::WalkDir;

use crate::config::IngestConfig;
use crate::error::{Result, WordwinError};

/// Lists the corpus documents named by `inputs`, in the order workers will count them.
///
/// A file input is taken as one document. A directory contributes every regular file below it
/// (only its direct children when [`IngestConfig::recursive`] is off), ordered by path so that
/// chunk indices and log lines are reproducible between runs. Symlinked documents are only
/// read with [`IngestConfig::follow_symlinks`].
pub fn collect_paths<P: AsRef<Path>>(inputs: &[P], cfg: &IngestConfig) -> Result<Vec<PathBuf>> {
    let mut documents = Vec::new();
    for input in inputs {
        let path = input.as_ref();
        let metadata = path.symlink_metadata().map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                WordwinError::InvalidConfig(format!("corpus input {path:?} does not exist"))
            } else {
                WordwinError::io(err, Some(path.to_path_buf()))
            }
        })?;
        if metadata.is_dir() {
            let before = documents.len();
            push_corpus_directory(path, cfg, &mut documents)?;
            debug!(
                "{} documents found under {}",
                documents.len() - before,
                path.display()
            );
        } else if metadata.is_file() || (cfg.follow_symlinks && path.is_file()) {
            documents.push(path.to_path_buf());
        } else {
            debug!("skipping corpus input {} (not a regular file)", path.display());
        }
    }
    if documents.is_empty() {
        return Err(WordwinError::InvalidConfig(
            "no corpus documents found in the provided inputs".into(),
        ));
    }
    Ok(documents)
}

fn push_corpus_directory(
    root: &Path,
    cfg: &IngestConfig,
    documents: &mut Vec<PathBuf>,
) -> Result<()> {
    let mut walker = WalkDir::new(root)
        .follow_links(cfg.follow_symlinks)
        .sort_by_file_name();
    if !cfg.recursive {
        walker = walker.max_depth(1);
    }
    let mut found = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|err| {
            let path = err.path().map(Path::to_path_buf);
            match err.into_io_error() {
                Some(io) => WordwinError::io(io, path),
                None => WordwinError::Internal(format!("symlink loop below {}", root.display())),
            }
        })?;
        if entry.file_type().is_file() {
            found.push(entry.into_path());
        }
    }
    found.sort();
    documents.extend(found);
    Ok(())
}

/// Number of chunks each file is split into for `num_workers` workers over `num_files` files.
#[must_use]
pub fn chunks_per_file(num_workers: usize, num_files: usize) -> usize {
    if num_files == 0 {
        return 1;
    }
    (num_workers / num_files).max(1)
}

/// Nominal `[start, end)` byte range of chunk `index` out of `num_chunks`.
///
/// The last chunk absorbs the remainder bytes.
#[must_use]
pub fn chunk_bounds(file_size: u64, index: usize, num_chunks: usize) -> (u64, u64) {
    let num_chunks = num_chunks.max(1) as u64;
    let index = index as u64;
    let chunk_size = file_size / num_chunks;
    let start = index * chunk_size;
    let end = if index + 1 == num_chunks {
        file_size
    } else {
        (index + 1) * chunk_size
    };
    (start, end)
}

/// Advances `offset` to the first position `p >= offset` such that `p` is `0`, end-of-file, or
/// directly follows one of the `boundary` bytes.
///
/// Applying this to both ends of every nominal chunk yields ranges that still partition the file
/// while never splitting a token.
pub fn align_offset(file: &mut File, offset: u64, file_size: u64, boundary: &[u8]) -> Result<u64> {
    if offset == 0 || offset >= file_size {
        return Ok(offset.min(file_size));
    }
    file.seek(SeekFrom::Start(offset - 1))
        .map_err(|err| WordwinError::io(err, None))?;
    let mut reader = BufReader::new(file);
    let mut position = offset - 1;
    loop {
        let buffer = reader
            .fill_buf()
            .map_err(|err| WordwinError::io(err, None))?;
        if buffer.is_empty() {
            return Ok(file_size);
        }
        if let Some(idx) = find_boundary(buffer, boundary) {
            return Ok((position + idx as u64 + 1).min(file_size));
        }
        let consumed = buffer.len();
        position += consumed as u64;
        reader.consume(consumed);
    }
}

/// Index of the first byte of `haystack` contained in `boundary`.
fn find_boundary(haystack: &[u8], boundary: &[u8]) -> Option<usize> {
    boundary
        .chunks(3)
        .filter_map(|set| match *set {
            [a] => memchr(a, haystack),
            [a, b] => memchr2(a, b, haystack),
            [a, b, c] => memchr3(a, b, c, haystack),
            _ => None,
        })
        .min()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn collect_paths_discovers_files_recursively() {
        let dir = tempdir().expect("tempdir");
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).expect("create nested directory");
        let file_a = dir.path().join("a.txt");
        let file_b = nested.join("b.txt");
        fs::write(&file_a, "alpha").expect("write a");
        fs::write(&file_b, "beta").expect("write b");

        let cfg = IngestConfig {
            recursive: true,
            ..IngestConfig::default()
        };
        let paths = collect_paths(&[dir.path()], &cfg).expect("collect paths");
        assert_eq!(paths, vec![file_a, file_b]);
    }

    #[test]
    fn collect_paths_rejects_missing_inputs() {
        let dir = tempdir().expect("tempdir");
        let missing = dir.path().join("missing.txt");
        let err = collect_paths(&[missing], &IngestConfig::default()).expect_err("missing");
        assert!(matches!(err, WordwinError::InvalidConfig(_)));
    }

    #[test]
    fn chunk_planning_divides_workers_across_files() {
        assert_eq!(chunks_per_file(8, 2), 4);
        assert_eq!(chunks_per_file(1, 3), 1);
        assert_eq!(chunks_per_file(5, 2), 2);
    }

    #[test]
    fn last_chunk_absorbs_remainder() {
        assert_eq!(chunk_bounds(10, 0, 3), (0, 3));
        assert_eq!(chunk_bounds(10, 1, 3), (3, 6));
        assert_eq!(chunk_bounds(10, 2, 3), (6, 10));
        assert_eq!(chunk_bounds(10, 0, 1), (0, 10));
    }

    #[test]
    fn collect_paths_stays_shallow_without_recursion() {
        let dir = tempdir().expect("tempdir");
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).expect("create nested directory");
        let file_b = dir.path().join("b.txt");
        let file_a = dir.path().join("a.txt");
        fs::write(&file_b, "beta").expect("write b");
        fs::write(&file_a, "alpha").expect("write a");
        fs::write(nested.join("c.txt"), "gamma").expect("write c");

        let cfg = IngestConfig {
            recursive: false,
            ..IngestConfig::default()
        };
        let paths = collect_paths(&[dir.path()], &cfg).expect("collect paths");
        assert_eq!(paths, vec![file_a, file_b]);
    }

    #[test]
    fn collect_paths_rejects_empty_directories() {
        let dir = tempdir().expect("tempdir");
        let err = collect_paths(&[dir.path()], &IngestConfig::default()).expect_err("empty");
        assert!(matches!(err, WordwinError::InvalidConfig(_)));
    }

    #[test]
    fn alignment_moves_past_next_delimiter() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("data.txt");
        fs::write(&path, "hello world foo").expect("write data");
        let mut file = File::open(&path).expect("open");

        assert_eq!(align_offset(&mut file, 0, 15, b" ").unwrap(), 0);
        // Offset 3 is inside "hello"; the next token starts at 6.
        assert_eq!(align_offset(&mut file, 3, 15, b" ").unwrap(), 6);
        // Offset 6 directly follows a space and is already aligned.
        assert_eq!(align_offset(&mut file, 6, 15, b" ").unwrap(), 6);
        // Inside the final token: aligned to end-of-file.
        assert_eq!(align_offset(&mut file, 13, 15, b" ").unwrap(), 15);
        assert_eq!(align_offset(&mut file, 20, 15, b" ").unwrap(), 15);
    }

    #[test]
    fn alignment_stops_at_nearest_boundary_of_any_kind() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("data.txt");
        fs::write(&path, "alpha\tbeta gamma\ndelta").expect("write data");
        let mut file = File::open(&path).expect("open");
        let boundary = b"\t\n\r ";

        assert_eq!(align_offset(&mut file, 2, 22, boundary).unwrap(), 6);
        assert_eq!(align_offset(&mut file, 8, 22, boundary).unwrap(), 11);
        assert_eq!(align_offset(&mut file, 13, 22, boundary).unwrap(), 17);
        // No boundary byte configured at all: everything collapses to end-of-file.
        assert_eq!(align_offset(&mut file, 2, 22, b"").unwrap(), 22);
    }

    #[test]
    fn nearest_boundary_wins_across_byte_groups() {
        assert_eq!(find_boundary(b"ab.cd e", b"\t\n\r ."), Some(2));
        assert_eq!(find_boundary(b"abcd e", b"\t\n\r ."), Some(4));
        assert_eq!(find_boundary(b"abcde", b"\t\n\r ."), None);
    }
}

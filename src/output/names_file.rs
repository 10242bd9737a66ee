//! Species names file
//!
//! The harvested names are written one per line to
//! `{directory}/marine{ClusterName}.txt`. The file is assembled in a temporary
//! file next to its destination and renamed into place, so an interrupted
//! write never leaves a partial list behind.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// File name for a cluster's names list, with all whitespace removed
pub fn names_file_name(cluster_name: &str) -> String {
    let compact: String = cluster_name.split_whitespace().collect();
    format!("marine{}.txt", compact)
}

/// Full path of a cluster's names list inside `directory`
pub fn names_file_path(directory: &Path, cluster_name: &str) -> PathBuf {
    directory.join(names_file_name(cluster_name))
}

/// Writes `names` to `path`, one per line, replacing any existing file
///
/// Missing parent directories are created.
pub fn write_names_file(path: &Path, names: &[String]) -> std::io::Result<()> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(directory)?;

    let mut file = NamedTempFile::new_in(directory)?;
    {
        let mut writer = BufWriter::new(file.as_file_mut());
        for name in names {
            writeln!(writer, "{}", name)?;
        }
        writer.flush()?;
    }
    file.as_file().sync_all()?;

    file.persist(path).map_err(|e| e.error)?;
    tracing::debug!("Wrote {} names to {}", names.len(), path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_name_strips_whitespace() {
        assert_eq!(names_file_name("Gastropoda"), "marineGastropoda.txt");
        assert_eq!(
            names_file_name("  Missing Cluster\tName "),
            "marineMissingClusterName.txt"
        );
    }

    #[test]
    fn test_write_names_file() {
        let dir = TempDir::new().unwrap();
        let path = names_file_path(dir.path(), "Bivalvia");
        let names = vec!["Abra alba".to_string(), "Abra nitida".to_string()];

        write_names_file(&path, &names).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "Abra alba\nAbra nitida\n");
    }

    #[test]
    fn test_write_creates_directory_and_replaces() {
        let dir = TempDir::new().unwrap();
        let path = names_file_path(&dir.path().join("nested").join("out"), "Bivalvia");

        write_names_file(&path, &["Old name".to_string()]).unwrap();
        write_names_file(&path, &["New name".to_string()]).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "New name\n");

        // Only the final file remains, no temporary leftovers
        let entries = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_write_empty_list() {
        let dir = TempDir::new().unwrap();
        let path = names_file_path(dir.path(), "Empty");

        write_names_file(&path, &[]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}

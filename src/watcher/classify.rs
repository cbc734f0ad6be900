//! File classification by name.
//!
//! A file is recognised when its stem starts with a fixed prefix and its
//! extension matches exactly, e.g. `proc.loop.1234.shm` for the `proc.` + `shm`
//! pattern. Directory components never take part in the match.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Type tag carried by every tracked file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// Linkable descriptor of a live control process.
    ProcessDescriptor,
    /// Human-readable process log.
    Log,
    /// Kernel connection file.
    Kernel,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileKind::ProcessDescriptor => "process",
            FileKind::Log => "log",
            FileKind::Kernel => "kernel",
        };
        f.write_str(name)
    }
}

/// Prefix + extension rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePattern {
    /// Required start of the file stem, dot included (`proc.`).
    pub prefix: String,
    /// Required extension, without the leading dot (`shm`).
    pub extension: String,
}

impl FilePattern {
    pub fn new(prefix: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            extension: extension.into(),
        }
    }

    /// Check the file name of `path` against this pattern.
    pub fn matches(&self, path: &Path) -> bool {
        let extension = self.extension.trim_start_matches('.');
        let (Some(stem), Some(ext)) = (
            path.file_stem().and_then(|s| s.to_str()),
            path.extension().and_then(|e| e.to_str()),
        ) else {
            return false;
        };
        ext == extension && stem.starts_with(&self.prefix)
    }

    /// The part of the stem after the prefix (`loop.1234` for `proc.loop.1234.shm`).
    pub fn strip<'a>(&self, path: &'a Path) -> Option<&'a str> {
        if !self.matches(path) {
            return None;
        }
        path.file_stem()
            .and_then(|s| s.to_str())
            .and_then(|stem| stem.strip_prefix(self.prefix.as_str()))
    }
}

/// Ordered set of rules; the first matching rule decides the type tag.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<(FilePattern, FileKind)>,
}

impl Classifier {
    /// Flat process directory: exactly one descriptor pattern.
    pub fn process(pattern: FilePattern) -> Self {
        Self {
            rules: vec![(pattern, FileKind::ProcessDescriptor)],
        }
    }

    /// Share tree: logs and kernel connection files.
    pub fn share(log: FilePattern, kernel: FilePattern) -> Self {
        Self {
            rules: vec![(log, FileKind::Log), (kernel, FileKind::Kernel)],
        }
    }

    /// Classify a path, `None` when no rule recognises it.
    pub fn classify(&self, path: &Path) -> Option<FileKind> {
        self.rules
            .iter()
            .find(|(pattern, _)| pattern.matches(path))
            .map(|(_, kind)| *kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn proc_pattern() -> FilePattern {
        FilePattern::new("proc.", "shm")
    }

    #[test]
    fn test_process_pattern() {
        let pattern = proc_pattern();
        assert!(pattern.matches(Path::new("/milk/proc/proc.42.shm")));
        assert!(pattern.matches(Path::new("/milk/proc/proc.loop.1234.shm")));
        assert!(!pattern.matches(Path::new("/milk/proc/proc.shm")));
        assert!(!pattern.matches(Path::new("/milk/proc/proc.42.shm.bak")));
        assert!(!pattern.matches(Path::new("/milk/proc/xproc.42.shm")));
        assert!(!pattern.matches(Path::new("/milk/proc/.shm")));
    }

    #[test]
    fn test_extension_with_leading_dot() {
        let pattern = FilePattern::new("proc.", ".shm");
        assert!(pattern.matches(Path::new("proc.42.shm")));
    }

    #[test]
    fn test_strip_prefix() {
        let pattern = proc_pattern();
        assert_eq!(pattern.strip(Path::new("/a/proc.loop.7.shm")), Some("loop.7"));
        assert_eq!(pattern.strip(Path::new("/a/log.loop.txt")), None);
    }

    #[test]
    fn test_share_classifier() {
        let classifier = Classifier::share(
            FilePattern::new("log.", "txt"),
            FilePattern::new("kernel.", "json"),
        );

        let nested = PathBuf::from("/milk/share/a/b/log.run1.txt");
        assert_eq!(classifier.classify(&nested), Some(FileKind::Log));
        assert_eq!(
            classifier.classify(Path::new("/milk/share/kernel.sess1.json")),
            Some(FileKind::Kernel)
        );
        assert_eq!(classifier.classify(Path::new("/milk/share/log.run1.json")), None);
        assert_eq!(classifier.classify(Path::new("/milk/share/notes.txt")), None);
    }

    #[test]
    fn test_directory_components_ignored() {
        let classifier = Classifier::process(proc_pattern());
        assert_eq!(classifier.classify(Path::new("/proc.1.shm/other")), None);
        assert_eq!(
            classifier.classify(Path::new("/other/proc.1.shm")),
            Some(FileKind::ProcessDescriptor)
        );
    }
}

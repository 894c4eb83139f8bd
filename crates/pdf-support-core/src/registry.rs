//! Fixed registry of the support files handed to the renderer.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Logical name of a support file. The set is closed.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportFile {
    Cover,
    Header,
    Footer,
}

impl SupportFile {
    pub const ALL: [SupportFile; 3] = [SupportFile::Cover, SupportFile::Header, SupportFile::Footer];

    pub fn as_str(self) -> &'static str {
        match self {
            SupportFile::Cover => "cover",
            SupportFile::Header => "header",
            SupportFile::Footer => "footer",
        }
    }

    /// File name inside the scratch directory, e.g. `cover_support_file.html`.
    pub fn file_name(self) -> String {
        format!("{}_support_file.html", self.as_str())
    }
}

impl fmt::Display for SupportFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SupportFile {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "cover" => Ok(SupportFile::Cover),
            "header" => Ok(SupportFile::Header),
            "footer" => Ok(SupportFile::Footer),
            other => Err(format!(
                "unknown support file '{other}' (expected cover, header or footer)"
            )),
        }
    }
}

/// Paths of the three support files, computed once from a scratch directory.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SupportFiles {
    cover: PathBuf,
    header: PathBuf,
    footer: PathBuf,
}

impl SupportFiles {
    pub fn in_directory(scratch: &Path) -> Self {
        SupportFiles {
            cover: scratch.join(SupportFile::Cover.file_name()),
            header: scratch.join(SupportFile::Header.file_name()),
            footer: scratch.join(SupportFile::Footer.file_name()),
        }
    }

    pub fn path(&self, kind: SupportFile) -> &Path {
        match kind {
            SupportFile::Cover => &self.cover,
            SupportFile::Header => &self.header,
            SupportFile::Footer => &self.footer,
        }
    }

    /// Iterate in cover, header, footer order.
    pub fn iter(&self) -> impl Iterator<Item = (SupportFile, &Path)> {
        SupportFile::ALL
            .into_iter()
            .map(move |kind| (kind, self.path(kind)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_holds_exactly_three_entries() {
        let files = SupportFiles::in_directory(Path::new("pdfkit"));
        let kinds: Vec<_> = files.iter().map(|(kind, _)| kind).collect();

        assert_eq!(
            kinds,
            vec![SupportFile::Cover, SupportFile::Header, SupportFile::Footer]
        );
        for (kind, path) in files.iter() {
            assert_eq!(path.parent(), Some(Path::new("pdfkit")));
            let name = path.file_name().unwrap().to_str().unwrap();
            assert!(name.ends_with("_support_file.html"));
            assert!(name.starts_with(kind.as_str()));
        }
    }

    #[test]
    fn parses_known_names_only() {
        assert_eq!("header".parse(), Ok(SupportFile::Header));
        let err = "toc".parse::<SupportFile>().unwrap_err();
        assert!(err.contains("unknown support file 'toc'"));
    }
}

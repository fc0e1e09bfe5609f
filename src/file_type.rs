//! Extension-based file classification.
//!
//! Maps a file's extension (and a few special filename patterns) to a broad
//! file type that the organizer uses to pick a target directory. The basic
//! types are enabled by default; extended types are opt-in via configuration.

use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

/// A broad file type used to route files to target directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Pdf,
    Image,
    Document,
    Video,
    Audio,
    Installer,
    Archive,
    Code,
    Font,
    Ebook,
}

impl FileType {
    /// All known file types, basic first.
    pub const ALL: [FileType; 10] = [
        FileType::Pdf,
        FileType::Image,
        FileType::Document,
        FileType::Video,
        FileType::Audio,
        FileType::Installer,
        FileType::Archive,
        FileType::Code,
        FileType::Font,
        FileType::Ebook,
    ];

    /// The configuration key and display name for this type.
    pub fn key(&self) -> &'static str {
        match self {
            FileType::Pdf => "pdf",
            FileType::Image => "image",
            FileType::Document => "document",
            FileType::Video => "video",
            FileType::Audio => "audio",
            FileType::Installer => "installer",
            FileType::Archive => "archive",
            FileType::Code => "code",
            FileType::Font => "font",
            FileType::Ebook => "ebook",
        }
    }

    /// Basic types are organized by default; extended types must be enabled
    /// in the configuration.
    pub fn is_basic(&self) -> bool {
        matches!(
            self,
            FileType::Pdf
                | FileType::Image
                | FileType::Document
                | FileType::Video
                | FileType::Audio
        )
    }

    /// Looks up a file type by its configuration key.
    pub fn from_key(key: &str) -> Option<FileType> {
        FileType::ALL.iter().copied().find(|t| t.key() == key)
    }

    /// Built-in extensions (without the leading dot) for this type.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            FileType::Pdf => &["pdf"],
            FileType::Image => &["jpg", "jpeg", "png", "gif", "bmp", "tiff", "svg", "webp"],
            FileType::Document => &[
                "doc", "docx", "txt", "rtf", "odt", "xls", "xlsx", "ppt", "pptx",
            ],
            FileType::Video => &["mp4", "avi", "mkv", "mov", "wmv", "flv", "webm", "m4v"],
            FileType::Audio => &["mp3", "wav", "flac", "aac", "ogg", "wma", "m4a"],
            FileType::Installer => &[
                "exe", "msi", "msix", "appx", "dmg", "pkg", "deb", "rpm", "snap", "flatpak",
                "appimage", "jar",
            ],
            FileType::Archive => &[
                "zip", "rar", "7z", "tar", "gz", "bz2", "xz", "tgz", "tbz2", "iso", "cab",
            ],
            FileType::Code => &[
                "html", "htm", "css", "js", "ts", "jsx", "tsx", "php", "py", "java", "c", "cpp",
                "h", "hpp", "cs", "go", "rs", "swift", "kt", "rb", "pl", "lua", "json", "xml",
                "yaml", "yml", "toml", "sql", "sh", "bash", "zsh", "ps1", "bat",
            ],
            FileType::Font => &["ttf", "otf", "woff", "woff2", "eot", "pfb", "bdf", "pcf"],
            FileType::Ebook => &[
                "epub", "mobi", "azw", "azw3", "fb2", "lit", "pdb", "djvu", "chm",
            ],
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Classifies files by extension and special filename patterns.
#[derive(Debug)]
pub struct TypeMapper {
    extension_map: HashMap<&'static str, FileType>,
    screenshot_pattern: Regex,
}

impl TypeMapper {
    /// Creates a mapper with the built-in extension tables.
    pub fn new() -> Self {
        let mut extension_map = HashMap::new();
        for file_type in FileType::ALL {
            for ext in file_type.extensions() {
                // First writer wins on overlap (e.g. "pdf" stays Pdf).
                extension_map.entry(*ext).or_insert(file_type);
            }
        }

        let screenshot_pattern = Regex::new(r"(?i)^screenshot.*\.(png|jpg|jpeg)$")
            .expect("Invalid screenshot pattern");

        Self {
            extension_map,
            screenshot_pattern,
        }
    }

    /// Determines the file type for a path.
    ///
    /// Filenames matching the screenshot pattern classify as images
    /// regardless of the extension table. Everything else is looked up by
    /// lowercased extension; unknown extensions yield `None`.
    pub fn classify(&self, path: &Path) -> Option<FileType> {
        if let Some(name) = path.file_name().map(|n| n.to_string_lossy())
            && self.screenshot_pattern.is_match(&name)
        {
            return Some(FileType::Image);
        }

        let ext = path.extension()?.to_string_lossy().to_lowercase();
        self.extension_map.get(ext.as_str()).copied()
    }
}

impl Default for TypeMapper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_classify_basic_types() {
        let mapper = TypeMapper::new();
        assert_eq!(mapper.classify(Path::new("report.pdf")), Some(FileType::Pdf));
        assert_eq!(mapper.classify(Path::new("photo.JPG")), Some(FileType::Image));
        assert_eq!(mapper.classify(Path::new("song.flac")), Some(FileType::Audio));
        assert_eq!(mapper.classify(Path::new("movie.mkv")), Some(FileType::Video));
        assert_eq!(mapper.classify(Path::new("notes.docx")), Some(FileType::Document));
    }

    #[test]
    fn test_classify_extended_types() {
        let mapper = TypeMapper::new();
        assert_eq!(mapper.classify(Path::new("setup.deb")), Some(FileType::Installer));
        assert_eq!(mapper.classify(Path::new("backup.tar")), Some(FileType::Archive));
        assert_eq!(mapper.classify(Path::new("main.rs")), Some(FileType::Code));
        assert_eq!(mapper.classify(Path::new("mono.woff2")), Some(FileType::Font));
        assert_eq!(mapper.classify(Path::new("novel.epub")), Some(FileType::Ebook));
    }

    #[test]
    fn test_unknown_extension_is_none() {
        let mapper = TypeMapper::new();
        assert_eq!(mapper.classify(Path::new("data.xyz")), None);
        assert_eq!(mapper.classify(Path::new("no_extension")), None);
    }

    #[test]
    fn test_screenshot_pattern_beats_extension_table() {
        let mapper = TypeMapper::new();
        let path = PathBuf::from("/tmp/Screenshot 2024-01-01.png");
        assert_eq!(mapper.classify(&path), Some(FileType::Image));
        assert_eq!(
            mapper.classify(Path::new("screenshot_final.jpeg")),
            Some(FileType::Image)
        );
        // Not a screenshot name, not an image extension.
        assert_eq!(mapper.classify(Path::new("screenshot.txt")), None);
    }

    #[test]
    fn test_from_key_round_trips() {
        for file_type in FileType::ALL {
            assert_eq!(FileType::from_key(file_type.key()), Some(file_type));
        }
        assert_eq!(FileType::from_key("nonsense"), None);
    }
}

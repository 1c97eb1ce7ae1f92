use std::path::PathBuf;

/// The input could not be turned into a document tree.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("failed to read document {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed XML at byte {position}: {source}")]
    Xml {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    #[error("document has no root element")]
    Empty,

    #[error("document has a second root element <{tag}>")]
    MultipleRoots { tag: String },

    #[error("document ends inside <{tag}>")]
    Unclosed { tag: String },
}

pub type Result<T> = std::result::Result<T, DocumentError>;

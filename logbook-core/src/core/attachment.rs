use serde::{Deserialize, Serialize};

/// A file stored alongside an entry.
///
/// `content` is skipped during serialization; only the metadata crosses the
/// JSON boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: i64,
    pub entry_id: i64,
    pub name: String,
    pub inserted: i64,
    #[serde(skip)]
    pub content: Vec<u8>,
}

impl Attachment {
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// Returns `true` if `name` is a single plain file name that is safe to write
/// into an export directory.
pub fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

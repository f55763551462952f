use nutype::nutype;

pub const MAX_FILE_ID_LENGTH: usize = 256;

/// Opaque identifier of a synced file, stable for the file's lifetime.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = MAX_FILE_ID_LENGTH),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        AsRef,
        Deref,
        TryFrom,
        Into,
        Hash,
        Display,
        Serialize,
        Deserialize,
    )
)]
pub struct FileId(String);

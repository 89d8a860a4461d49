//! Per-user profile records
//!
//! A profile exists in two forms: [`UserDoc`] is the stored shape with
//! binary attachments inlined as base64, [`UserProfile`] is the hydrated
//! in-memory shape where each attachment has been rehomed to a filesystem
//! path. The writer only ever sends the scalar prefs back to the store.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigMap;

/// The three binary attachment slots a profile can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobKind {
    /// Custom upload thumbnail
    Thumbnail,
    /// Remote-storage credential file
    Rclone,
    /// Watermark image
    Watermark,
}

impl BlobKind {
    /// All attachment slots, in extraction order
    pub const ALL: [BlobKind; 3] = [Self::Thumbnail, Self::Rclone, Self::Watermark];

    /// Field name inside the stored document
    pub fn field(&self) -> &'static str {
        match self {
            Self::Thumbnail => "thumb",
            Self::Rclone => "rclone",
            Self::Watermark => "watermark",
        }
    }

    /// Directory the blob is rehomed under
    pub fn dir(&self) -> &'static str {
        match self {
            Self::Thumbnail => "Thumbnails",
            Self::Rclone => "rclone",
            Self::Watermark => "wm",
        }
    }

    /// File extension of the rehomed blob
    pub fn ext(&self) -> &'static str {
        match self {
            Self::Thumbnail => "jpg",
            Self::Rclone => "conf",
            Self::Watermark => "png",
        }
    }

    /// Path of the rehomed blob relative to the work dir
    pub fn rel_path(&self, owner: i64) -> PathBuf {
        PathBuf::from(self.dir()).join(format!("{owner}.{}", self.ext()))
    }
}

impl std::fmt::Display for BlobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.field())
    }
}

/// Stored form of a user profile
///
/// Attachments travel inside the document as base64 strings; every other
/// preference is kept as-is in the flattened map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserDoc {
    #[serde(skip_serializing_if = "Option::is_none", with = "b64")]
    pub thumb: Option<Vec<u8>>,

    #[serde(skip_serializing_if = "Option::is_none", with = "b64")]
    pub rclone: Option<Vec<u8>>,

    #[serde(skip_serializing_if = "Option::is_none", with = "b64")]
    pub watermark: Option<Vec<u8>>,

    /// Scalar preferences, opaque to this layer
    #[serde(flatten)]
    pub prefs: ConfigMap,
}

impl UserDoc {
    /// Bytes of one attachment slot, if present
    pub fn blob(&self, kind: BlobKind) -> Option<&Vec<u8>> {
        match kind {
            BlobKind::Thumbnail => self.thumb.as_ref(),
            BlobKind::Rclone => self.rclone.as_ref(),
            BlobKind::Watermark => self.watermark.as_ref(),
        }
    }
}

/// Hydrated in-memory form of a user profile
///
/// Attachment fields hold the filesystem path the blob was written to
/// during hydration; they are stripped again before any write-back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserProfile {
    pub thumb: Option<PathBuf>,
    pub rclone: Option<PathBuf>,
    pub watermark: Option<PathBuf>,
    pub prefs: ConfigMap,
}

impl UserProfile {
    /// Path of one attachment slot, if present
    pub fn blob_path(&self, kind: BlobKind) -> Option<&PathBuf> {
        match kind {
            BlobKind::Thumbnail => self.thumb.as_ref(),
            BlobKind::Rclone => self.rclone.as_ref(),
            BlobKind::Watermark => self.watermark.as_ref(),
        }
    }

    /// Set one attachment slot
    pub fn set_blob_path(&mut self, kind: BlobKind, path: PathBuf) {
        match kind {
            BlobKind::Thumbnail => self.thumb = Some(path),
            BlobKind::Rclone => self.rclone = Some(path),
            BlobKind::Watermark => self.watermark = Some(path),
        }
    }
}

/// Base64 serde for optional byte fields
pub(crate) mod b64 {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => s.serialize_str(&STANDARD.encode(b)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|s| STANDARD.decode(s).map_err(de::Error::custom))
            .transpose()
    }
}

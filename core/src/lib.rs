pub mod blob_store;
pub mod display;
pub mod remote;
pub mod resolver;
pub mod session;
pub mod source;
pub mod state;
pub mod tracking;
pub mod types;

pub use display::{DebugReport, DisplayState, PlaceholderLabel, resolve_display_state};
pub use resolver::{AssetResolver, AssetSource, ResolvedAsset, ResolverOptions};
pub use session::{FileSync, FileSyncImageState, ImageView, SessionSlot};
pub use source::{FileRecords, LocalDocuments, SyncSource};

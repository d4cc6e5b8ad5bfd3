//! # desk-blob
//!
//! Media storage for mediadesk.
//!
//! Blobs live as plain files in one directory under a stored name of the
//! form `{epochMillis}-{originalName}`. Display metadata (display name,
//! description) lives in a side-store keyed by that name.
//!
//! ```text
//! MediaLibrary ── BlobStore (FsBlobStore)
//!              └─ MetadataStore (JsonFileMetadataStore / MemoryMetadataStore)
//! ```
//!
//! Listings are filtered, sorted and paginated by [`ListingQuery`] and
//! [`Pagination`], which are pure and also used on the client side.
//!
//! ```rust,no_run
//! use desk_blob::{BlobConfig, MediaLibrary, stream_from_bytes};
//!
//! # async fn example() -> desk_blob::BlobResult<()> {
//! let library = MediaLibrary::from_config(
//!     BlobConfig::new()
//!         .with_uploads_dir("uploads")
//!         .with_public_base_url("http://localhost:5000/uploads"),
//! );
//!
//! let blob = library.put("cat.png", None, stream_from_bytes(&b"..."[..])).await?;
//! println!("{} -> {}", blob.stored_name, blob.access_url);
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod fs_store;
mod library;
pub mod listing;
pub mod metadata;
pub mod naming;
pub mod stats;
mod store;
mod types;

pub use config::BlobConfig;
pub use error::{BlobError, BlobResult};
pub use fs_store::FsBlobStore;
pub use library::MediaLibrary;
pub use listing::{
    DateRange, ListingQuery, MediaCategory, Page, Pagination, SortOrder, TypeFilter,
};
pub use metadata::{JsonFileMetadataStore, MemoryMetadataStore, MetadataRecord, MetadataStore};
pub use naming::StoredName;
pub use stats::{export_csv, LibraryStats, EXPORT_FILE_NAME};
pub use store::{BlobStore, GetResult, ObjectEntry, ObjectHead, PutResult};
pub use types::{collect_stream, stream_from_bytes, stream_from_file, Blob, ByteStream, MetadataPatch};

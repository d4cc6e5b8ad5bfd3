//! Client side of the mediadesk console.
//!
//! [`FileApi`] abstracts the store (over HTTP with [`HttpFileApi`], or
//! in-process with [`LocalFileApi`]). [`FileManager`] drives uploads and
//! deletions, [`FileView`] holds the list's filter/sort/pagination state and
//! [`ListingPoller`] keeps a listing fresh.

mod error;

pub mod api;
pub mod controller;
pub mod http;
pub mod poller;
pub mod session;
pub mod view;

pub use api::{FileApi, LocalFileApi, UploadFile};
pub use controller::{BatchOutcome, Confirmation, FileManager, Status};
pub use error::ClientError;
pub use http::HttpFileApi;
pub use poller::{AutoRefresh, ListingPoller, DEFAULT_POLL_INTERVAL};
pub use session::Session;
pub use view::FileView;

//! Tower layers shipped with the adapter.

pub mod multipart;

pub use multipart::{
    MultipartConfig, MultipartToJson, MultipartToJsonService, SPOOLED_FILES_HEADER, TEMP_FILE_PREFIX,
};

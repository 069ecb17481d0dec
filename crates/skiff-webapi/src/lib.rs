//! Generic web API update channel.
//!
//! Checks a caller-specified endpoint that answers a flat JSON object
//! (`updateAvailable`, `version`, `downloadUrl`, ...). Multi-tenant servers
//! branch on the `X-Application-Name` / `X-Application-Version` headers; an
//! optional API key travels as `X-API-Key`. A `SHA256:` marker embedded in
//! the notes blob is lifted into the checksum field.

mod source;

pub(crate) const SOURCE_NAME: &str = "web-api";

pub use source::{WebApiSource, extract_sha256};

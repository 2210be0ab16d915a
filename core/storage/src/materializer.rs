//! Folder chain materialization (`makedirs`).

use tracing::{debug, info};

use driveremote_common::{Error, Result, StoragePath};

use crate::resolver::first_match;
use crate::transport::{DriveTransport, FOLDER_MIME_TYPE};

/// Make sure every segment of `path` exists as a folder.
///
/// Existing segments are checked and must be folders. From the first
/// missing segment on, every remaining segment is created as a new folder,
/// each under the previous one. Returns the ID of the deepest folder; the
/// root itself is returned as-is.
///
/// Calling this again on a fully existing chain creates nothing.
///
/// # Errors
/// - `NotAFolder` naming the offending path when an existing segment is
///   not a folder; nothing below it is created
/// - Any transport failure
pub async fn makedirs<T>(transport: &T, path: &StoragePath) -> Result<String>
where
    T: DriveTransport + ?Sized,
{
    let segments = path.segments();
    let mut parent_id = path.root_id();
    let mut depth = 0;

    while depth < segments.len() {
        let segment = segments[depth];
        let children = transport.list_children(&parent_id, false).await?;
        let Some(existing) = first_match(&children, segment) else {
            break;
        };

        if !existing.is_folder() {
            return Err(Error::NotAFolder(path.prefix(depth + 1).to_string()));
        }

        debug!("{} exists as {}", path.prefix(depth + 1), existing.id);
        parent_id = existing.id.clone();
        depth += 1;
    }

    for segment in &segments[depth..] {
        let folder = transport
            .create_resource(segment, &[parent_id.clone()], Some(FOLDER_MIME_TYPE))
            .await?;
        info!("Created folder {:?} ({}) under {}", segment, folder.id, parent_id);
        parent_id = folder.id;
    }

    Ok(parent_id)
}

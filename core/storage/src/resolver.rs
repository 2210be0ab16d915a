//! Path-to-ID resolution over an ID-addressed drive.
//!
//! The drive has no path lookup. A path is resolved by walking it one
//! segment at a time from the root, listing the children of the current
//! folder and picking the first child whose title equals the segment.
//! Duplicate titles are tolerated: whichever resource the transport lists
//! first wins. No result is cached, so every call observes the current
//! remote state and costs one listing per segment.

use tracing::{debug, info, warn};

use driveremote_common::{Result, StoragePath};

use crate::transport::{DriveTransport, Resource, FOLDER_MIME_TYPE};

/// First resource in `children` titled `title`.
pub(crate) fn first_match<'a>(children: &'a [Resource], title: &str) -> Option<&'a Resource> {
    let mut matches = children.iter().filter(|r| r.title == title);
    let first = matches.next()?;

    let extra = matches.count();
    if extra > 0 {
        warn!(
            "{} resources titled {:?}, using the first listed ({})",
            extra + 1,
            title,
            first.id
        );
    }

    Some(first)
}

/// Resolve `path` to a resource ID.
///
/// Returns `Ok(None)` as soon as a segment has no match and `create` is
/// false; later segments are never listed. With `create` set, the first
/// unmatched segment and every segment after it are created as folders.
/// Folders created by this call are known to be empty, so no listing is
/// issued below them.
///
/// A path with no segments resolves to the root ID without any call.
///
/// # Errors
/// - Any transport failure while listing or creating
pub async fn resolve<T>(transport: &T, path: &StoragePath, create: bool) -> Result<Option<String>>
where
    T: DriveTransport + ?Sized,
{
    let mut current_id = path.root_id();
    let mut creating = false;

    for segment in path.segments() {
        if !creating {
            let children = transport.list_children(&current_id, false).await?;
            debug!(
                "Listed {} children of {} looking for {:?}",
                children.len(),
                current_id,
                segment
            );

            if let Some(found) = first_match(&children, segment) {
                current_id = found.id.clone();
                continue;
            }

            if !create {
                debug!("{:?} not found under {}, {} does not exist", segment, current_id, path);
                return Ok(None);
            }

            creating = true;
        }

        let folder = transport
            .create_resource(segment, &[current_id.clone()], Some(FOLDER_MIME_TYPE))
            .await?;
        info!("Created folder {:?} ({}) under {}", segment, folder.id, current_id);
        current_id = folder.id;
    }

    Ok(Some(current_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTransport;

    fn path(url: &str) -> StoragePath {
        StoragePath::parse(url).unwrap()
    }

    #[tokio::test]
    async fn test_root_resolves_without_listing() {
        let drive = MemoryTransport::new();

        let id = resolve(&drive, &path("gdrive://root"), false).await.unwrap();
        assert_eq!(id.as_deref(), Some("root"));

        let id = resolve(&drive, &path("gdrive://AppDataFolder/"), true).await.unwrap();
        assert_eq!(id.as_deref(), Some("appDataFolder"));

        assert_eq!(drive.list_calls(), 0);
        assert_eq!(drive.mutation_calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_first_segment_stops_after_one_listing() {
        let drive = MemoryTransport::new();

        let id = resolve(&drive, &path("gdrive://root/Datasets/my-dataset"), false)
            .await
            .unwrap();

        assert_eq!(id, None);
        assert_eq!(drive.list_calls(), 1);
        assert_eq!(drive.mutation_calls(), 0);
    }

    #[tokio::test]
    async fn test_resolves_nested_path() {
        let drive = MemoryTransport::new();
        let datasets = drive.seed_folder("Datasets", "root");
        let dataset = drive.seed_folder("my-dataset", &datasets);

        let id = resolve(&drive, &path("gdrive://root/Datasets/my-dataset"), false)
            .await
            .unwrap();

        assert_eq!(id, Some(dataset));
        assert_eq!(drive.list_calls(), 2);
    }

    #[tokio::test]
    async fn test_missing_inner_segment_returns_none() {
        let drive = MemoryTransport::new();
        drive.seed_folder("Datasets", "root");

        let id = resolve(&drive, &path("gdrive://root/Datasets/missing/deeper"), false)
            .await
            .unwrap();

        assert_eq!(id, None);
        assert_eq!(drive.list_calls(), 2);
        assert_eq!(drive.mutation_calls(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_titles_first_listed_wins() {
        let drive = MemoryTransport::new();
        let first = drive.seed_folder("data", "root");
        drive.seed_folder("data", "root");

        for _ in 0..3 {
            let id = resolve(&drive, &path("gdrive://root/data"), false).await.unwrap();
            assert_eq!(id.as_deref(), Some(first.as_str()));
        }
    }

    #[tokio::test]
    async fn test_trashed_resources_are_ignored() {
        let drive = MemoryTransport::new();
        let trashed = drive.seed_folder("data", "root");
        drive.trash(&trashed).unwrap();

        let id = resolve(&drive, &path("gdrive://root/data"), false).await.unwrap();
        assert_eq!(id, None);
    }

    #[tokio::test]
    async fn test_create_builds_missing_chain() {
        let drive = MemoryTransport::new();
        let a = drive.seed_folder("a", "root");

        let id = resolve(&drive, &path("gdrive://root/a/b/c"), true)
            .await
            .unwrap()
            .unwrap();

        // One listing for "a", one for "b"; "c" goes under a fresh folder.
        assert_eq!(drive.list_calls(), 2);
        assert_eq!(drive.mutation_calls(), 2);

        let b = drive.children_titled(&a, "b");
        assert_eq!(b.len(), 1);
        let c = drive.children_titled(&b[0].id, "c");
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].id, id);
        assert!(c[0].is_folder());
    }

    #[tokio::test]
    async fn test_create_is_idempotent_once_present() {
        let drive = MemoryTransport::new();
        let target = path("gdrive://root/x/y");

        let first = resolve(&drive, &target, true).await.unwrap();
        let created = drive.mutation_calls();

        let second = resolve(&drive, &target, true).await.unwrap();
        let third = resolve(&drive, &target, true).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second, third);
        assert_eq!(drive.mutation_calls(), created);
        assert_eq!(drive.len(), 2);
    }

    #[tokio::test]
    async fn test_explicit_folder_id_root() {
        let drive = MemoryTransport::new();
        let base = drive.seed_folder("shared", "root");
        let child = drive.seed_folder("data", &base);

        let url = format!("gdrive://{}/data", base);
        let id = resolve(&drive, &path(&url), false).await.unwrap();
        assert_eq!(id, Some(child));
    }

    #[test]
    fn test_first_match_prefers_listing_order() {
        let mk = |id: &str, title: &str| Resource {
            id: id.to_string(),
            title: title.to_string(),
            mime_type: FOLDER_MIME_TYPE.to_string(),
            parents: vec!["root".to_string()],
            md5_checksum: None,
            size: None,
            modified_time: None,
            trashed: false,
        };
        let children = vec![mk("1", "x"), mk("2", "y"), mk("3", "y")];

        assert_eq!(first_match(&children, "y").map(|r| r.id.as_str()), Some("2"));
        assert!(first_match(&children, "z").is_none());
    }
}

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufReader, ErrorKind};
use std::path::{Component, Path, PathBuf};

use binstore_types::{ByteStream, Identifier, Metadata};
use tempfile::NamedTempFile;

use crate::error::{ResolverError, ResolverResult};
use crate::traits::Resolver;

/// Filesystem-backed resolver for the `file` scheme.
///
/// Each partition is bound to a root directory. An identifier's
/// scheme-specific part is used verbatim as a path relative to that root:
/// `file:a/b.bin` in a partition rooted at `/data` lives at `/data/a/b.bin`.
/// Leading slashes are ignored and `..` components are refused, so content
/// never escapes the root.
///
/// Writes go to a temporary file in the destination directory, which is then
/// renamed over the target. Concurrent readers see the old file or the new
/// one, never a partial write.
#[derive(Debug, Default)]
pub struct FileResolver {
    roots: HashMap<String, PathBuf>,
}

impl FileResolver {
    pub const SCHEMES: &'static [&'static str] = &["file"];

    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `partition` to the directory `root`.
    pub fn with_partition(mut self, partition: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        self.roots.insert(partition.into(), root.into());
        self
    }

    /// Root directory of `partition`, if configured.
    pub fn root(&self, partition: &str) -> Option<&Path> {
        self.roots.get(partition).map(PathBuf::as_path)
    }

    /// The path holding `identifier` in `partition`.
    ///
    /// Returns `Ok(None)` when the partition has no root directory.
    pub fn path_for(&self, partition: &str, identifier: &Identifier) -> ResolverResult<Option<PathBuf>> {
        let Some(root) = self.roots.get(partition) else {
            tracing::debug!(partition, "no root directory for partition");
            return Ok(None);
        };
        let relative = Path::new(identifier.scheme_specific_part().trim_start_matches('/'));
        let invalid = |reason: &str| ResolverError::InvalidIdentifier {
            identifier: identifier.to_string(),
            reason: reason.to_string(),
        };
        if relative.as_os_str().is_empty() {
            return Err(invalid("empty path"));
        }
        let mut named = false;
        for component in relative.components() {
            match component {
                Component::Normal(_) => named = true,
                Component::CurDir => {}
                Component::ParentDir => return Err(invalid("parent directory references are not allowed")),
                Component::RootDir | Component::Prefix(_) => return Err(invalid("path must be relative")),
            }
        }
        if !named {
            return Err(invalid("path names no file"));
        }
        Ok(Some(root.join(relative)))
    }

    fn require_path(&self, partition: &str, identifier: &Identifier) -> ResolverResult<PathBuf> {
        self.path_for(partition, identifier)?
            .ok_or_else(|| ResolverError::UnknownPartition {
                resolver: self.name().to_string(),
                partition: partition.to_string(),
            })
    }
}

impl Resolver for FileResolver {
    fn name(&self) -> &str {
        "file"
    }

    fn uri_schemes(&self) -> &'static [&'static str] {
        Self::SCHEMES
    }

    fn exists(&self, partition: &str, identifier: &Identifier) -> ResolverResult<bool> {
        let Some(path) = self.path_for(partition, identifier)? else {
            return Ok(false);
        };
        match fs::metadata(&path) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to stat content");
                Err(ResolverError::io(format!("checking {}", path.display()), e))
            }
        }
    }

    fn get_content(&self, partition: &str, identifier: &Identifier) -> ResolverResult<Option<ByteStream>> {
        let Some(path) = self.path_for(partition, identifier)? else {
            return Ok(None);
        };
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to open content");
                return Err(ResolverError::io(format!("opening {}", path.display()), e));
            }
        };
        let is_dir = file
            .metadata()
            .map_err(|e| ResolverError::io(format!("inspecting {}", path.display()), e))?
            .is_dir();
        if is_dir {
            return Ok(None);
        }
        Ok(Some(Box::new(BufReader::new(file))))
    }

    fn set_content(
        &self,
        partition: &str,
        identifier: &Identifier,
        mut content: ByteStream,
        _metadata: &Metadata,
    ) -> ResolverResult<()> {
        let path = self.require_path(partition, identifier)?;
        let target = path.display().to_string();
        let fail = |stage: &str, e: io::Error| {
            tracing::error!(path = %target, stage, error = %e, "failed to write content");
            ResolverError::write(target.clone(), format!("{stage}: {e}"))
        };

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(|e| fail("creating parent directories", e))?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| fail("creating temporary file", e))?;
        let written = io::copy(&mut content, &mut tmp).map_err(|e| fail("copying content", e))?;
        drop(content);
        tmp.as_file().sync_all().map_err(|e| fail("syncing", e))?;
        tmp.persist(&path).map_err(|e| fail("replacing target", e.error))?;

        tracing::debug!(partition, path = %target, bytes = written, "content stored");
        Ok(())
    }

    fn purge_content(&self, partition: &str, identifier: &Identifier) -> ResolverResult<()> {
        let Some(path) = self.path_for(partition, identifier)? else {
            return Ok(());
        };
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(partition, path = %path.display(), "content purged");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to purge content");
                Err(ResolverError::write(path.display().to_string(), e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};
    use std::sync::Arc;
    use std::thread;

    fn id(s: &str) -> Identifier {
        Identifier::parse(s).unwrap()
    }

    fn stream(data: &[u8]) -> ByteStream {
        Box::new(Cursor::new(data.to_vec()))
    }

    fn read_all(mut s: ByteStream) -> Vec<u8> {
        let mut buf = Vec::new();
        s.read_to_end(&mut buf).unwrap();
        buf
    }

    fn resolver(root: &Path) -> FileResolver {
        FileResolver::new().with_partition("repository", root)
    }

    // ------------------------------------------------------------------
    // Path mapping
    // ------------------------------------------------------------------

    #[test]
    fn maps_specific_part_under_root() {
        let r = FileResolver::new().with_partition("repository", "/srv/data");
        let path = r.path_for("repository", &id("file:a/b/c.bin")).unwrap().unwrap();
        assert_eq!(path, PathBuf::from("/srv/data/a/b/c.bin"));
        let path = r.path_for("repository", &id("file:///x/y")).unwrap().unwrap();
        assert_eq!(path, PathBuf::from("/srv/data/x/y"));
    }

    #[test]
    fn specific_part_is_not_decoded() {
        let r = FileResolver::new().with_partition("p", "/root");
        let path = r.path_for("p", &id("file:with%20space")).unwrap().unwrap();
        assert_eq!(path, PathBuf::from("/root/with%20space"));
    }

    #[test]
    fn rejects_escaping_paths() {
        let r = FileResolver::new().with_partition("p", "/root");
        for bad in ["file:../etc/passwd", "file:a/../../b", "file:", "file:///", "file:.", "file:./", "file:./."] {
            let err = r.path_for("p", &id(bad)).unwrap_err();
            assert!(matches!(err, ResolverError::InvalidIdentifier { .. }), "{bad}");
        }
    }

    #[test]
    fn unknown_partition_has_no_path() {
        let r = FileResolver::new();
        assert!(r.path_for("missing", &id("file:x")).unwrap().is_none());
        assert!(r.root("missing").is_none());
    }

    // ------------------------------------------------------------------
    // Content round trip
    // ------------------------------------------------------------------

    #[test]
    fn set_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let r = resolver(dir.path());
        let target = id("file:a_file_resource");

        assert!(!r.exists("repository", &target).unwrap());
        assert!(r.get_content("repository", &target).unwrap().is_none());

        r.set_content("repository", &target, stream(b"Some data"), &Metadata::new())
            .unwrap();
        assert!(r.exists("repository", &target).unwrap());
        let got = r.get_content("repository", &target).unwrap().unwrap();
        assert_eq!(read_all(got), b"Some data");
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let r = resolver(dir.path());
        let target = id("file:deep/nested/dirs/blob");
        r.set_content("repository", &target, stream(b"x"), &Metadata::new())
            .unwrap();
        assert!(dir.path().join("deep/nested/dirs/blob").is_file());
    }

    #[test]
    fn overwrite_keeps_only_latest() {
        let dir = tempfile::tempdir().unwrap();
        let r = resolver(dir.path());
        let target = id("file:item");
        r.set_content("repository", &target, stream(b"first payload"), &Metadata::new())
            .unwrap();
        r.set_content("repository", &target, stream(b"second"), &Metadata::new())
            .unwrap();
        let got = r.get_content("repository", &target).unwrap().unwrap();
        assert_eq!(read_all(got), b"second");
        // no temporary files left behind
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn failed_stream_leaves_prior_content() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(ErrorKind::ConnectionReset, "gone"))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let r = resolver(dir.path());
        let target = id("file:item");
        r.set_content("repository", &target, stream(b"kept"), &Metadata::new())
            .unwrap();
        let err = r
            .set_content("repository", &target, Box::new(Broken), &Metadata::new())
            .unwrap_err();
        assert!(matches!(err, ResolverError::Write { .. }));
        let got = r.get_content("repository", &target).unwrap().unwrap();
        assert_eq!(read_all(got), b"kept");
    }

    #[test]
    fn partitions_are_isolated() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        let r = FileResolver::new()
            .with_partition("a", a.path())
            .with_partition("b", b.path());
        let target = id("file:shared-name");
        r.set_content("a", &target, stream(b"in a"), &Metadata::new()).unwrap();
        assert!(r.exists("a", &target).unwrap());
        assert!(!r.exists("b", &target).unwrap());
    }

    #[test]
    fn directories_are_not_content() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let r = resolver(dir.path());
        assert!(!r.exists("repository", &id("file:sub")).unwrap());
        assert!(r.get_content("repository", &id("file:sub")).unwrap().is_none());
    }

    // ------------------------------------------------------------------
    // Purge and unknown partitions
    // ------------------------------------------------------------------

    #[test]
    fn purge_removes_and_tolerates_absence() {
        let dir = tempfile::tempdir().unwrap();
        let r = resolver(dir.path());
        let target = id("file:gone");
        r.set_content("repository", &target, stream(b"bye"), &Metadata::new())
            .unwrap();
        r.purge_content("repository", &target).unwrap();
        assert!(!r.exists("repository", &target).unwrap());
        r.purge_content("repository", &target).unwrap();
    }

    #[test]
    fn unknown_partition_behaviour() {
        let r = FileResolver::new();
        let target = id("file:x");
        assert!(!r.exists("nope", &target).unwrap());
        assert!(r.get_content("nope", &target).unwrap().is_none());
        r.purge_content("nope", &target).unwrap();
        let err = r
            .set_content("nope", &target, stream(b"x"), &Metadata::new())
            .unwrap_err();
        assert!(matches!(err, ResolverError::UnknownPartition { .. }));
    }

    // ------------------------------------------------------------------
    // Capabilities
    // ------------------------------------------------------------------

    #[test]
    fn multipart_fails_fast() {
        let r = FileResolver::new();
        assert_eq!(r.uri_schemes(), &["file"]);
        assert!(!r.supports_multipart_upload());
        let err = r.initiate_upload("p", &id("file:x"), "text/plain").unwrap_err();
        assert!(matches!(err, ResolverError::Unsupported { operation: "initiate_upload", .. }));
        let session = binstore_multipart::SessionId::from("s");
        assert!(r.upload_part(&session, 1, 1, stream(b"x")).is_err());
        assert!(r.list_parts(&session).is_err());
        assert!(r.complete_upload(&session, &Default::default()).is_err());
        assert!(r.abort_upload(&session).is_err());
        assert!(r.upload_session_exists(&session).is_err());
    }

    #[test]
    fn concurrent_readers_never_see_partial_writes() {
        let dir = tempfile::tempdir().unwrap();
        let r = Arc::new(resolver(dir.path()));
        let target = id("file:hot");
        let a = vec![b'a'; 64 * 1024];
        let b = vec![b'b'; 64 * 1024];
        r.set_content("repository", &target, stream(&a), &Metadata::new())
            .unwrap();

        let writer = {
            let r = Arc::clone(&r);
            let target = target.clone();
            let (a, b) = (a.clone(), b.clone());
            thread::spawn(move || {
                for i in 0..20 {
                    let data = if i % 2 == 0 { &b } else { &a };
                    r.set_content("repository", &target, stream(data), &Metadata::new())
                        .unwrap();
                }
            })
        };
        for _ in 0..50 {
            if let Some(s) = r.get_content("repository", &target).unwrap() {
                let got = read_all(s);
                assert!(got == a || got == b, "saw a partial write of {} bytes", got.len());
            }
        }
        writer.join().unwrap();
    }
}

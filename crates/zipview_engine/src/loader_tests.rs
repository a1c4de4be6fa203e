/* 📖 # Why are the loader tests in their own file?

They need a PAL whose fetch can be held open, to observe a load that is still in flight.
That scaffolding would drown the loader itself, so it lives here.
*/

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::mpsc::{Receiver, Sender, channel};
    use std::sync::{Arc, Mutex};

    use zipview_base::error::ErrorKind;
    use zipview_base::{
        FilePath, HttpResponse, HttpServerConfig, HttpServerHandle, HttpService, HttpStatusCode,
        MockPal, OutboundRequest, Pal, PalHandle, ReadSeek, ZipviewResult,
    };

    use crate::loader::{ArchiveLoader, PERSISTED_ARCHIVE_KEY, decode_archive, initial_url_from_query};
    use crate::store::{ArchiveMetadata, InMemoryByteStore, StoreHandle};
    use crate::test_support::{build_zip, sample_zip};
    use crate::tree::build_tree;

    const PROXY: &str = "http://127.0.0.1:3000";

    fn setup() -> (MockPal, StoreHandle, ArchiveLoader) {
        let mock = MockPal::new();
        let store = StoreHandle::new(InMemoryByteStore::new());
        let loader = ArchiveLoader::new(PalHandle::new(mock.clone()), store.clone(), PROXY);
        (mock, store, loader)
    }

    fn proxy_url(target: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
        format!("{}/api/proxy?url={}", PROXY, encoded)
    }

    #[test]
    fn test_end_to_end_sample_archive() {
        let (_mock, _store, loader) = setup();
        let archive = loader
            .load_from_bytes(sample_zip(), "sample.zip", None)
            .unwrap()
            .unwrap();

        let summary = archive.summary();
        assert_eq!(summary.file_count, 2);
        assert_eq!(summary.directory_count, 1);
        assert_eq!(summary.total_size, 8 + 8);

        let tree = build_tree(archive.entries());
        assert_eq!(tree.children().len(), 1);
        let docs = tree.child("docs").unwrap();
        assert!(docs.is_directory());
        assert_eq!(docs.children().len(), 2);
        assert!(docs.children().values().all(|child| !child.is_directory()));
    }

    #[test]
    fn test_decoded_entries_keep_order_content_and_flags() {
        let entries = decode_archive(&sample_zip()).unwrap();
        let paths: Vec<&str> = entries.iter().map(|entry| entry.path()).collect();
        assert_eq!(paths, vec!["docs/", "docs/readme.md", "docs/logo.png"]);
        assert!(entries[0].is_directory());
        assert_eq!(entries[0].content(), None);
        assert_eq!(entries[1].content(), Some(&b"# Hello\n"[..]));
        assert_eq!(entries[1].size(), 8);
    }

    #[test]
    fn test_empty_file_has_empty_content_not_none() {
        let entries = decode_archive(&build_zip(&[("empty.txt", Some(b""))])).unwrap();
        assert_eq!(entries[0].content(), Some(&b""[..]));
        assert_eq!(entries[0].size(), 0);
    }

    #[test]
    fn test_missing_size_falls_back_to_content_length() {
        let mut bytes = build_zip(&[("notes.txt", Some(b"hello hello hello"))]);
        // Zero the uncompressed size in the local header and the central directory record
        bytes[22..26].copy_from_slice(&[0; 4]);
        let central = bytes
            .windows(4)
            .position(|window| window == b"PK\x01\x02")
            .unwrap();
        bytes[central + 24..central + 28].copy_from_slice(&[0; 4]);

        let entries = decode_archive(&bytes).unwrap();
        assert_eq!(entries[0].content(), Some(&b"hello hello hello"[..]));
        assert_eq!(entries[0].size(), 17);
    }

    #[test]
    fn test_invalid_bytes_are_decode_error_and_keep_previous_state() {
        let (_mock, _store, loader) = setup();
        loader.load_from_bytes(sample_zip(), "good.zip", None).unwrap();

        let error = loader
            .load_from_bytes(b"definitely not a zip".to_vec(), "bad.zip", None)
            .unwrap_err();
        assert!(matches!(error.kind(), ErrorKind::Decode { .. }));
        assert!(error.to_string().starts_with("Invalid ZIP archive: "));
        assert_eq!(loader.current().unwrap().source_name(), "good.zip");
        assert!(!loader.is_loading());
    }

    #[test]
    fn test_new_load_replaces_previous_archive() {
        let (_mock, _store, loader) = setup();
        loader.load_from_bytes(sample_zip(), "first.zip", None).unwrap();
        let second = build_zip(&[("only.txt", Some(b"x"))]);
        loader.load_from_bytes(second, "second.zip", None).unwrap();

        let current = loader.current().unwrap();
        assert_eq!(current.source_name(), "second.zip");
        assert_eq!(current.entries().len(), 1);
    }

    #[test]
    fn test_local_file_extension_is_checked_before_io() {
        let (mock, _store, loader) = setup();
        let error = loader
            .load_from_local_file(&FilePath::from("missing/notes.txt"))
            .unwrap_err();
        assert!(matches!(error.kind(), ErrorKind::Validation { .. }));
        assert_eq!(error.to_string(), "Please select a valid ZIP file");
        assert!(mock.file_paths().is_empty());
    }

    #[test]
    fn test_local_file_extension_is_case_insensitive() {
        let (mock, _store, loader) = setup();
        mock.add_file(FilePath::from("downloads/Backup.ZIP"), sample_zip());
        let archive = loader
            .load_from_local_file(&FilePath::from("downloads/Backup.ZIP"))
            .unwrap()
            .unwrap();
        assert_eq!(archive.source_name(), "Backup.ZIP");
        assert_eq!(archive.source_url(), None);
    }

    #[test]
    fn test_missing_local_file_is_file_error() {
        let (_mock, _store, loader) = setup();
        let error = loader
            .load_from_local_file(&FilePath::from("nope.zip"))
            .unwrap_err();
        assert!(matches!(error.kind(), ErrorKind::FileError { .. }));
    }

    #[test]
    fn test_load_from_url_goes_through_proxy() {
        let (mock, _store, loader) = setup();
        let target = "https://example.com/files/release.zip";
        mock.add_fetch_response(proxy_url(target), HttpResponse::ok().with_body(sample_zip()));

        let archive = loader.load_from_url(target).unwrap().unwrap();
        assert_eq!(archive.source_name(), "release.zip");
        assert_eq!(archive.source_url(), Some(target));
        let requests = mock.fetched_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].url(),
            "http://127.0.0.1:3000/api/proxy?url=https%3A%2F%2Fexample.com%2Ffiles%2Frelease.zip"
        );
    }

    #[test]
    fn test_load_from_url_surfaces_status_and_proxy_message() {
        let (mock, _store, loader) = setup();
        let target = "https://example.com/gone.zip";
        mock.add_fetch_response(
            proxy_url(target),
            HttpResponse::internal_error().with_body(r#"{"error":"HTTP 404"}"#),
        );

        let error = loader.load_from_url(target).unwrap_err();
        assert!(matches!(
            error.kind(),
            ErrorKind::Fetch {
                status: Some(500),
                ..
            }
        ));
        assert_eq!(error.to_string(), "HTTP 500: HTTP 404");
        assert!(loader.current().is_none());
    }

    #[test]
    fn test_load_from_url_falls_back_to_reason_phrase() {
        let (mock, _store, loader) = setup();
        let target = "https://example.com/a.zip";
        mock.add_fetch_response(
            proxy_url(target),
            HttpResponse::new(HttpStatusCode::BadGateway).with_body("<html>"),
        );
        let error = loader.load_from_url(target).unwrap_err();
        assert_eq!(error.to_string(), "HTTP 502: Bad Gateway");
    }

    #[test]
    fn test_load_from_url_validates_input() {
        let (mock, _store, loader) = setup();
        for input in ["", "   ", "not a url"] {
            let error = loader.load_from_url(input).unwrap_err();
            assert!(matches!(error.kind(), ErrorKind::Validation { .. }), "{input:?}");
        }
        assert!(mock.fetched_requests().is_empty());
    }

    #[test]
    fn test_successful_load_is_persisted() {
        let (_mock, store, loader) = setup();
        let bytes = sample_zip();
        loader
            .load_from_bytes(bytes.clone(), "sample.zip", Some("https://x.test/sample.zip".to_string()))
            .unwrap();
        loader.wait_for_persistence();

        let blob = store.get(PERSISTED_ARCHIVE_KEY).unwrap().unwrap();
        assert_eq!(blob.bytes, bytes);
        assert_eq!(
            blob.metadata,
            ArchiveMetadata {
                name: "sample.zip".to_string(),
                source_url: Some("https://x.test/sample.zip".to_string()),
            }
        );
    }

    #[test]
    fn test_restore_and_clear_persisted() {
        let (mock, store, loader) = setup();
        loader.load_from_bytes(sample_zip(), "sample.zip", None).unwrap();
        loader.wait_for_persistence();

        // A fresh session over the same store
        let restored_loader = ArchiveLoader::new(PalHandle::new(mock), store.clone(), PROXY);
        let restored = restored_loader.restore_persisted().unwrap().unwrap();
        assert_eq!(restored.source_name(), "sample.zip");
        assert_eq!(restored.entries().len(), 3);
        assert_eq!(restored_loader.current().unwrap().source_name(), "sample.zip");

        restored_loader.clear_persisted().unwrap();
        assert_eq!(store.get(PERSISTED_ARCHIVE_KEY).unwrap(), None);
        assert!(restored_loader.restore_persisted().unwrap().is_none());
    }

    #[test]
    fn test_unreadable_persisted_archive_is_discarded() {
        let (_mock, store, loader) = setup();
        let metadata = ArchiveMetadata {
            name: "broken.zip".to_string(),
            source_url: None,
        };
        store.put(PERSISTED_ARCHIVE_KEY, b"garbage", &metadata).unwrap();

        assert!(loader.restore_persisted().unwrap().is_none());
        assert_eq!(store.get(PERSISTED_ARCHIVE_KEY).unwrap(), None);
    }

    #[derive(Debug)]
    struct FailingStore;

    impl crate::store::ByteStore for FailingStore {
        fn put(&mut self, _: &str, _: &[u8], _: &ArchiveMetadata) -> ZipviewResult<()> {
            zipview_base::bail!("disk full")
        }

        fn get(&self, _: &str) -> ZipviewResult<Option<crate::store::StoredBlob>> {
            zipview_base::bail!("disk unreadable")
        }

        fn clear(&mut self) -> ZipviewResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_persistence_failures_never_fail_the_load() {
        let loader = ArchiveLoader::new(
            PalHandle::new(MockPal::new()),
            StoreHandle::new(FailingStore),
            PROXY,
        );
        let archive = loader.load_from_bytes(sample_zip(), "sample.zip", None).unwrap();
        assert!(archive.is_some());
        loader.wait_for_persistence();
        assert!(loader.restore_persisted().unwrap().is_none());
    }

    #[test]
    fn test_initial_url_from_query() {
        assert_eq!(
            initial_url_from_query("?url=https%3A%2F%2Fexample.com%2Fa%20b.zip"),
            Some("https://example.com/a b.zip".to_string())
        );
        assert_eq!(
            initial_url_from_query("lang=en&url=https://example.com/a.zip"),
            Some("https://example.com/a.zip".to_string())
        );
        assert_eq!(initial_url_from_query("?url="), None);
        assert_eq!(initial_url_from_query(""), None);
    }

    /// A PAL whose fetch blocks until the test releases it.
    #[derive(Debug)]
    struct GatedPal {
        inner: MockPal,
        entered: Mutex<Sender<()>>,
        release: Mutex<Receiver<()>>,
    }

    impl Pal for GatedPal {
        fn file_exists(&self, path: &FilePath) -> ZipviewResult<bool> {
            self.inner.file_exists(path)
        }

        fn read_file(&self, path: &FilePath) -> ZipviewResult<Box<dyn ReadSeek + 'static>> {
            self.inner.read_file(path)
        }

        fn create_file(&self, path: &FilePath) -> ZipviewResult<Box<dyn Write>> {
            self.inner.create_file(path)
        }

        fn create_directory_all(&self, path: &FilePath) -> ZipviewResult<()> {
            self.inner.create_directory_all(path)
        }

        fn remove_file(&self, path: &FilePath) -> ZipviewResult<()> {
            self.inner.remove_file(path)
        }

        fn remove_directory_all(&self, path: &FilePath) -> ZipviewResult<()> {
            self.inner.remove_directory_all(path)
        }

        fn start_http_server(
            &self,
            service: Box<dyn HttpService>,
            config: HttpServerConfig,
        ) -> ZipviewResult<HttpServerHandle> {
            self.inner.start_http_server(service, config)
        }

        fn fetch(&self, request: &OutboundRequest) -> ZipviewResult<HttpResponse> {
            self.entered.lock().unwrap().send(()).unwrap();
            self.release.lock().unwrap().recv().unwrap();
            self.inner.fetch(request)
        }
    }

    #[test]
    fn test_second_load_while_loading_is_dropped() {
        let (entered_tx, entered_rx) = channel();
        let (release_tx, release_rx) = channel();
        let inner = MockPal::new();
        let target = "https://example.com/slow.zip";
        inner.add_fetch_response(proxy_url(target), HttpResponse::ok().with_body(sample_zip()));
        let pal = PalHandle::new(GatedPal {
            inner,
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        });
        let loader = Arc::new(ArchiveLoader::new(
            pal,
            StoreHandle::new(InMemoryByteStore::new()),
            PROXY,
        ));

        let background = {
            let loader = Arc::clone(&loader);
            std::thread::spawn(move || loader.load_from_url(target))
        };
        entered_rx.recv().unwrap();
        assert!(loader.is_loading());

        let dropped = loader
            .load_from_bytes(build_zip(&[("x.txt", Some(b"x"))]), "other.zip", None)
            .unwrap();
        assert!(dropped.is_none());
        assert!(loader.current().is_none());

        release_tx.send(()).unwrap();
        let loaded = background.join().unwrap().unwrap().unwrap();
        assert_eq!(loaded.source_name(), "slow.zip");
        assert!(!loader.is_loading());
        assert_eq!(loader.current().unwrap().source_name(), "slow.zip");
    }
}

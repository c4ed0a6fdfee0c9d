use ghrepo_cli::api::{ContentsClient, MARKER_FILE, PING_MESSAGE};
use ghrepo_cli::error::Error;
use ghrepo_cli::memory::MemoryTransport;
use ghrepo_cli::models::{DirEntry, DirectoryRemoval, EntryType};
use reqwest::{Method, StatusCode};

fn client() -> ContentsClient<MemoryTransport> {
    ContentsClient::with_transport(MemoryTransport::new())
}

fn store(client: &ContentsClient<MemoryTransport>) -> &MemoryTransport {
    client.transport()
}

fn entry(name: &str, kind: EntryType) -> DirEntry {
    DirEntry {
        name: name.to_string(),
        kind,
    }
}

#[test]
fn missing_path_is_not_found_and_absent() {
    let client = client();
    store(&client).insert("present.txt", "x");

    for path in ["nope.txt", "dir/nope", "present.txt/child"] {
        assert!(matches!(client.read(path), Err(Error::NotFound { .. })), "{path}");
        assert_eq!(client.entry_type(path), None, "{path}");
    }
}

#[test]
fn content_round_trips_byte_for_byte() {
    let client = client();
    let payloads: Vec<Vec<u8>> = vec![
        Vec::new(),
        b"hello".to_vec(),
        vec![0xff, 0xfe, 0x00, 0x01, 0x80],
        (0..=255u8).cycle().take(4096).collect(),
    ];

    for (i, payload) in payloads.iter().enumerate() {
        let path = format!("data/blob{i}.bin");
        let outcome = client.write(&path, payload, "store blob").unwrap();
        assert_eq!(outcome.entry.path, path);
        assert_eq!(&client.read(&outcome.entry.path).unwrap(), payload);
    }
}

#[test]
fn read_text_rejects_binary() {
    let client = client();
    store(&client).insert("bin", vec![0xc3u8, 0x28]);
    store(&client).insert("text", "grüße");

    assert!(matches!(client.read_text("bin"), Err(Error::NotText { .. })));
    assert_eq!(client.read_text("text").unwrap(), "grüße");
}

#[test]
fn read_on_directory_is_not_a_file() {
    let client = client();
    store(&client).insert("docs/readme.md", "# hi");

    assert!(matches!(client.read("docs"), Err(Error::NotAFile { .. })));
    assert_eq!(client.resolve_version("docs").unwrap(), None);
}

#[test]
fn stale_version_token_conflicts() {
    let client = client();
    client.write("shared.txt", b"v0", "init").unwrap();
    let token = client.resolve_version("shared.txt").unwrap().unwrap();

    // Someone else updates the file with the token we hold.
    client
        .put_file("shared.txt", b"v1", "external edit", Some(&token))
        .unwrap();

    let err = client
        .put_file("shared.txt", b"v2", "our edit", Some(&token))
        .unwrap_err();
    assert!(err.is_conflict(), "{err:?}");
    assert_eq!(err.status(), Some(StatusCode::CONFLICT));
    assert_eq!(client.read("shared.txt").unwrap(), b"v1");
}

#[test]
fn missing_version_token_on_existing_file_conflicts() {
    let client = client();
    client.write("f.txt", b"one", "init").unwrap();

    let err = client.put_file("f.txt", b"two", "blind", None).unwrap_err();
    assert!(err.is_conflict(), "{err:?}");
    assert_eq!(err.status(), Some(StatusCode::UNPROCESSABLE_ENTITY));
}

#[test]
fn create_then_update_scenario() {
    let client = client();

    let created = client.write("notes/todo.txt", b"hello", "add todo").unwrap();
    assert!(created.created);
    assert_eq!(created.entry.kind, EntryType::File);

    let puts: Vec<_> = store(&client)
        .requests()
        .into_iter()
        .filter(|r| r.method == Method::PUT)
        .collect();
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].sha(), None);

    store(&client).clear_requests();
    let updated = client
        .put_file("notes/todo.txt", b"hello again", "edit todo", Some(created.version()))
        .unwrap();
    assert!(!updated.created);
    assert_ne!(updated.version(), created.version());

    let requests = store(&client).requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].sha(), Some(created.version()));
    assert_eq!(client.read_text("notes/todo.txt").unwrap(), "hello again");
}

#[test]
fn write_resolves_token_for_existing_file() {
    let client = client();
    let original = store(&client).insert("cfg.toml", "a = 1");

    let outcome = client.write("cfg.toml", b"a = 2", "bump").unwrap();
    assert!(!outcome.created);

    let put = store(&client)
        .requests()
        .into_iter()
        .find(|r| r.method == Method::PUT)
        .unwrap();
    assert_eq!(put.sha(), Some(original.as_str()));
    assert_eq!(put.body.as_ref().unwrap()["message"], "bump");
}

#[test]
fn write_does_not_retry_on_transport_error() {
    let client = client();
    store(&client).fail_next(Method::PUT, "x.txt", StatusCode::INTERNAL_SERVER_ERROR, "boom");

    let err = client.write("x.txt", b"x", "m").unwrap_err();
    match err {
        Error::Api {
            status, message, ..
        } => {
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(message, "boom");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    let puts = store(&client)
        .requests()
        .iter()
        .filter(|r| r.method == Method::PUT)
        .count();
    assert_eq!(puts, 1);
    assert!(store(&client).file("x.txt").is_none());
}

#[test]
fn version_lookup_failure_is_propagated() {
    let client = client();
    store(&client).fail_next(Method::GET, "x.txt", StatusCode::UNAUTHORIZED, "Bad credentials");

    let err = client.write("x.txt", b"x", "m").unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
    assert!(store(&client).requests().iter().all(|r| r.method == Method::GET));
}

#[test]
fn delete_missing_file_is_not_found() {
    let client = client();
    let err = client.delete("ghost.txt", "bye").unwrap_err();
    assert!(err.is_not_found());
    assert!(store(&client)
        .requests()
        .iter()
        .all(|r| r.method != Method::DELETE));
}

#[test]
fn delete_removes_file_with_message() {
    let client = client();
    store(&client).insert("old.log", "log");

    let commit = client.delete("old.log", "cleanup").unwrap();
    assert_eq!(commit.message.as_deref(), Some("cleanup"));
    assert_eq!(client.entry_type("old.log"), None);
}

#[test]
fn list_keeps_store_order_and_kinds() {
    let client = client();
    store(&client).insert("src/main.rs", "fn main() {}");
    store(&client).insert("Cargo.toml", "[package]");
    store(&client).insert("README.md", "# r");

    let entries = client.list("").unwrap();
    assert_eq!(
        entries,
        vec![
            entry("Cargo.toml", EntryType::File),
            entry("README.md", EntryType::File),
            entry("src", EntryType::Dir),
        ]
    );
}

#[test]
fn list_errors() {
    let client = client();
    store(&client).insert("file.txt", "x");

    assert!(matches!(client.list("file.txt"), Err(Error::NotADirectory { .. })));
    assert!(matches!(client.list("missing"), Err(Error::NotFound { .. })));
}

#[test]
fn entry_type_reports_kinds_and_swallows_errors() {
    let client = client();
    store(&client).insert("a/b.txt", "b");

    assert_eq!(client.entry_type("a"), Some(EntryType::Dir));
    assert_eq!(client.entry_type("a/b.txt"), Some(EntryType::File));

    store(&client).fail_next(Method::GET, "a", StatusCode::SERVICE_UNAVAILABLE, "down");
    assert_eq!(client.entry_type("a"), None);
}

#[test]
fn remote_message_is_passed_through() {
    let client = client();
    store(&client).fail_next(Method::GET, "f", StatusCode::FORBIDDEN, "Resource not accessible by integration");

    let err = client.read("f").unwrap_err();
    assert!(err.to_string().contains("Resource not accessible by integration"));
    assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
}

#[test]
fn create_directory_appears_in_listing() {
    let client = client();

    let outcome = client.create_directory("a/b").unwrap();
    assert_eq!(outcome.entry.path, format!("a/b/{MARKER_FILE}"));
    assert_eq!(store(&client).file("a/b/.gitkeep").unwrap(), b" ");

    let listing = client.list("a").unwrap();
    assert!(listing.contains(&entry("b", EntryType::Dir)));
    assert_eq!(client.entry_type("a/b"), Some(EntryType::Dir));

    let put = store(&client)
        .requests()
        .into_iter()
        .find(|r| r.method == Method::PUT)
        .unwrap();
    assert_eq!(put.body.unwrap()["message"], "Directory created: a/b");
}

#[test]
fn create_directory_twice_updates_marker() {
    let client = client();
    client.create_directory("logs/").unwrap();
    let again = client.create_directory("logs").unwrap();
    assert!(!again.created);
}

#[test]
fn create_directory_rejects_root() {
    let client = client();
    assert!(matches!(client.create_directory("/"), Err(Error::InvalidPath(_))));
    assert!(store(&client).requests().is_empty());
}

#[test]
fn delete_directory_with_only_marker() {
    let client = client();
    client.create_directory("a/b").unwrap();

    let removal = client.delete_directory("a/b", "Directory deleted.").unwrap();
    assert!(matches!(removal, DirectoryRemoval::Removed(_)));
    assert_eq!(client.entry_type("a/b"), None);
    assert_eq!(client.entry_type("a"), None);
}

#[test]
fn delete_directory_without_marker_is_informational() {
    let client = client();
    assert_eq!(
        client.delete_directory("empty", "Directory deleted.").unwrap(),
        DirectoryRemoval::MarkerAbsent
    );

    // Other files under the prefix are not inspected and stay put.
    store(&client).insert("full/data.csv", "1,2");
    assert_eq!(
        client.delete_directory("full", "Directory deleted.").unwrap(),
        DirectoryRemoval::MarkerAbsent
    );
    assert_eq!(client.entry_type("full"), Some(EntryType::Dir));
}

#[test]
fn delete_directory_keeps_other_failures() {
    let client = client();
    client.create_directory("d").unwrap();
    store(&client).fail_next(Method::DELETE, "d/.gitkeep", StatusCode::FORBIDDEN, "protected branch");

    let err = client.delete_directory("d", "Directory deleted.").unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
}

#[test]
fn move_relocates_content() {
    let client = client();
    let content = vec![0u8, 159, 146, 150, b'x'];
    store(&client).insert("x", content.clone());

    let outcome = client.move_file("x", "y", None).unwrap();
    assert_eq!(outcome.entry.path, "y");

    assert_eq!(client.entry_type("x"), None);
    assert_eq!(client.entry_type("y"), Some(EntryType::File));
    assert_eq!(client.read("y").unwrap(), content);

    let messages: Vec<String> = store(&client)
        .requests()
        .into_iter()
        .filter(|r| r.method != Method::GET)
        .map(|r| r.body.unwrap()["message"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(messages, vec!["Move: x -> y", "Move: x -> y"]);
}

#[test]
fn move_uses_given_message() {
    let client = client();
    store(&client).insert("a.txt", "a");
    client.move_file("a.txt", "dir/b.txt", Some("rename a")).unwrap();

    let delete = store(&client)
        .requests()
        .into_iter()
        .find(|r| r.method == Method::DELETE)
        .unwrap();
    assert_eq!(delete.body.unwrap()["message"], "rename a");
}

#[test]
fn move_aborts_when_destination_write_fails() {
    let client = client();
    store(&client).insert("x", "data");
    store(&client).fail_next(Method::PUT, "y", StatusCode::INTERNAL_SERVER_ERROR, "boom");

    let err = client.move_file("x", "y", None).unwrap_err();
    assert!(matches!(err, Error::Api { .. }), "{err:?}");
    assert_eq!(store(&client).file("x").unwrap(), b"data");
    assert!(store(&client).file("y").is_none());
    assert!(store(&client)
        .requests()
        .iter()
        .all(|r| r.method != Method::DELETE));
}

#[test]
fn move_reports_partial_failure() {
    let client = client();
    store(&client).insert("x", "data");
    store(&client).fail_next(Method::DELETE, "x", StatusCode::FORBIDDEN, "protected");

    let err = client.move_file("x", "y", None).unwrap_err();
    match &err {
        Error::PartialMove {
            from,
            to,
            version,
            source,
        } => {
            assert_eq!(from, "x");
            assert_eq!(to, "y");
            assert_eq!(Some(version.clone()), store(&client).version("y"));
            assert_eq!(source.status(), Some(StatusCode::FORBIDDEN));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(store(&client).file("x").unwrap(), b"data");
    assert_eq!(store(&client).file("y").unwrap(), b"data");
}

#[test]
fn move_onto_itself_is_rejected() {
    let client = client();
    store(&client).insert("a.txt", "precious");
    store(&client).insert("dir/b.txt", "also precious");

    for (from, to) in [("a.txt", "a.txt"), ("dir//b.txt", "dir/b.txt"), ("/a.txt/", "a.txt")] {
        let err = client.move_file(from, to, None).unwrap_err();
        assert!(matches!(err, Error::InvalidPath(_)), "{from} -> {to}: {err:?}");
    }

    assert!(store(&client).requests().is_empty());
    assert_eq!(store(&client).file("a.txt").unwrap(), b"precious");
    assert_eq!(store(&client).file("dir/b.txt").unwrap(), b"also precious");
}

#[test]
fn move_requires_a_file_source() {
    let client = client();
    store(&client).insert("dir/inner.txt", "i");

    assert!(matches!(client.move_file("dir", "other", None), Err(Error::NotAFile { .. })));
    assert!(matches!(client.move_file("ghost", "other", None), Err(Error::NotFound { .. })));
    assert_eq!(store(&client).paths(), vec!["dir/inner.txt".to_string()]);
}

#[test]
fn upload_and_download_through_local_files() {
    let client = client();
    let dir = tempfile::tempdir().unwrap();

    let source = dir.path().join("logo.png");
    let bytes = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
    std::fs::write(&source, &bytes).unwrap();

    let outcome = client.upload(&source, "assets/logo.png", "Update logo.png").unwrap();
    assert!(outcome.created);

    let target = dir.path().join("copy.png");
    let written = client.download("assets/logo.png", &target).unwrap();
    assert_eq!(written, bytes.len());
    assert_eq!(std::fs::read(&target).unwrap(), bytes);
}

#[test]
fn local_failures_are_local_io() {
    let client = client();
    let dir = tempfile::tempdir().unwrap();
    store(&client).insert("f.txt", "f");

    let missing = dir.path().join("nope.bin");
    assert!(matches!(
        client.upload(&missing, "f2.txt", "m"),
        Err(Error::LocalIo { .. })
    ));
    assert!(store(&client).requests().is_empty());

    let unwritable = dir.path().join("no-such-dir").join("f.txt");
    let err = client.download("f.txt", &unwritable).unwrap_err();
    match err {
        Error::LocalIo { path, .. } => assert_eq!(path, unwritable),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn ping_leaves_no_trace() {
    let client = client();
    let name = client.ping().unwrap();
    assert!(name.starts_with('.') && name.ends_with(".ping"));
    assert!(store(&client).paths().is_empty());

    let requests = store(&client).requests();
    let put = requests.iter().find(|r| r.method == Method::PUT).unwrap();
    assert_eq!(put.body.as_ref().unwrap()["message"], PING_MESSAGE);
    assert!(requests.iter().any(|r| r.method == Method::DELETE && r.path == name));
}

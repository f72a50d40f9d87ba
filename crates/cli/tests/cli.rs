use assert_cmd::Command;

fn bookshelf() -> Command {
    let mut cmd = Command::cargo_bin("bookshelf").unwrap();
    cmd.env("BOOKSHELF_CONFIG_DIR", env!("CARGO_MANIFEST_DIR"));
    cmd
}

#[test]
fn help_lists_resources() {
    let output = bookshelf().arg("--help").output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("books"));
    assert!(stdout.contains("author"));
    assert!(stdout.contains("view"));
}

#[test]
fn invalid_route_is_rejected() {
    let output = bookshelf().args(["view", "/books/abc/edit"]).output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid entity id 'abc'"));
}

#[test]
fn unreachable_server_fails() {
    bookshelf()
        .args(["--server", "http://127.0.0.1:9", "books", "get", "1"])
        .assert()
        .failure();
}

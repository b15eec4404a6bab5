use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Command running in an empty directory with its own config home.
fn vidsum(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("vidsum").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env_remove("OPENAI_API_KEY")
        .env_remove("TRANSCRIPT_API_KEY")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let home = TempDir::new().unwrap();
    vidsum(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("summarize"))
        .stdout(predicate::str::contains("transcript"))
        .stdout(predicate::str::contains("links"));
}

#[test]
fn test_links_from_local_page() {
    let home = TempDir::new().unwrap();
    let page = home.path().join("course.html");
    fs_err::write(
        &page,
        r#"<html><body>
            <a href="https://www.youtube.com/watch?v=aaaaaaaaaaa">Lecture one</a>
            <iframe src="https://www.youtube.com/embed/bbbbbbbbbbb" title="Lecture two"></iframe>
        </body></html>"#,
    )
    .unwrap();

    vidsum(&home)
        .args(["--quiet", "links"])
        .arg(&page)
        .assert()
        .success()
        .stdout(predicate::str::contains("aaaaaaaaaaa\tLecture one"))
        .stdout(predicate::str::contains("bbbbbbbbbbb\tLecture two"));
}

#[test]
fn test_summarize_requires_openai_key() {
    let home = TempDir::new().unwrap();
    vidsum(&home)
        .args(["--quiet", "summarize", "aaaaaaaaaaa"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing credential: openai_api_key"));
}

#[test]
fn test_transcript_rejects_unknown_input() {
    let home = TempDir::new().unwrap();
    vidsum(&home)
        .args(["transcript", "https://example.com/not-a-video"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not a recognizable video URL"));
}

#[test]
fn test_config_stores_and_masks_keys() {
    let home = TempDir::new().unwrap();
    vidsum(&home)
        .args(["config", "--set-openai-key", "sk-very-secret", "--show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("OpenAI API Key: ••••••••"))
        .stdout(predicate::str::contains("sk-very-secret").not());

    #[cfg(target_os = "linux")]
    {
        let stored =
            fs_err::read_to_string(home.path().join(".config/video-summarizer/config.yaml")).unwrap();
        assert!(stored.contains("sk-very-secret"));
    }
}

use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::{tempdir, TempDir};

fn create_bucket(dir: &TempDir, bucket: &str, objects: &[(&str, &str)]) -> Result<()> {
    for (key, content) in objects {
        let path = dir.path().join(bucket).join(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
    }
    Ok(())
}

fn s3grep(dir: &TempDir) -> Result<Command> {
    let mut cmd = Command::cargo_bin("s3grep")?;
    cmd.current_dir(dir.path()).env_remove("RUST_LOG");
    Ok(cmd)
}

#[test]
fn test_single_match() -> Result<()> {
    let dir = tempdir()?;
    create_bucket(&dir, "B", &[("notes.txt", "hello\nworld\n")])?;

    s3grep(&dir)?
        .args(["grep", "--bucket", "B", "--local-dir"])
        .arg(dir.path())
        .arg("world")
        .assert()
        .success()
        .stdout("s3://B/notes.txt 2:world\n");
    Ok(())
}

#[test]
fn test_ignore_case() -> Result<()> {
    let dir = tempdir()?;
    create_bucket(&dir, "B", &[("a", "The Quick Brown Fox")])?;

    s3grep(&dir)?
        .args(["grep", "-b", "B", "-i", "--local-dir"])
        .arg(dir.path())
        .arg("QUICK")
        .assert()
        .success()
        .stdout("s3://B/a 1:The Quick Brown Fox\n");
    Ok(())
}

#[test]
fn test_prefix_and_nested_keys() -> Result<()> {
    let dir = tempdir()?;
    create_bucket(
        &dir,
        "logs",
        &[
            ("2023/app.log", "ERROR old\n"),
            ("2024/01/app.log", "ok\nERROR new\n"),
        ],
    )?;

    s3grep(&dir)?
        .args(["grep", "--bucket", "logs", "--prefix", "2024/", "--local-dir"])
        .arg(dir.path())
        .arg("ERROR")
        .assert()
        .success()
        .stdout("s3://logs/2024/01/app.log 2:ERROR new\n");
    Ok(())
}

#[test]
fn test_no_matches_still_succeeds() -> Result<()> {
    let dir = tempdir()?;
    create_bucket(&dir, "B", &[("a", "nothing to see")])?;

    s3grep(&dir)?
        .args(["grep", "--bucket", "B", "--local-dir"])
        .arg(dir.path())
        .arg("needle")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    Ok(())
}

#[test]
fn test_empty_bucket() -> Result<()> {
    let dir = tempdir()?;
    fs::create_dir(dir.path().join("B"))?;

    s3grep(&dir)?
        .args(["grep", "--bucket", "B", "--stats", "--local-dir"])
        .arg(dir.path())
        .arg("x")
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Searched"));
    Ok(())
}

#[test]
fn test_missing_bucket_is_fatal() -> Result<()> {
    let dir = tempdir()?;

    s3grep(&dir)?
        .args(["grep", "--bucket", "nope", "--local-dir"])
        .arg(dir.path())
        .arg("x")
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Failed to list s3://nope/"));
    Ok(())
}

#[test]
fn test_bucket_required() -> Result<()> {
    let dir = tempdir()?;

    s3grep(&dir)?
        .args(["grep", "--local-dir"])
        .arg(dir.path())
        .arg("x")
        .assert()
        .failure()
        .stderr(predicate::str::contains("bucket is required"));
    Ok(())
}

#[test]
fn test_empty_query_rejected() -> Result<()> {
    let dir = tempdir()?;

    s3grep(&dir)?
        .args(["grep", "--bucket", "B", ""])
        .assert()
        .failure();
    Ok(())
}

#[test]
fn test_bucket_from_config_file() -> Result<()> {
    let dir = tempdir()?;
    create_bucket(&dir, "configured", &[("k", "find me\n")])?;
    let config_path = dir.path().join("s3grep.yaml");
    fs::write(
        &config_path,
        format!(
            "bucket: configured\nworker_count: 2\nstore:\n  local_dir: {:?}\n",
            dir.path().display().to_string()
        ),
    )?;

    s3grep(&dir)?
        .arg("--config")
        .arg(&config_path)
        .args(["grep", "find"])
        .assert()
        .success()
        .stdout("s3://configured/k 1:find me\n");
    Ok(())
}

#[test]
fn test_many_objects_all_reported() -> Result<()> {
    let dir = tempdir()?;
    let objects: Vec<(String, String)> = (0..40)
        .map(|i| (format!("obj-{:02}.txt", i), format!("line\nhit {}\n", i)))
        .collect();
    let refs: Vec<(&str, &str)> = objects
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    create_bucket(&dir, "B", &refs)?;

    let output = s3grep(&dir)?
        .args(["grep", "--bucket", "B", "--workers", "7", "--local-dir"])
        .arg(dir.path())
        .arg("hit")
        .output()?;
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    let mut lines: Vec<_> = stdout.lines().collect();
    lines.sort_unstable();
    let expected: Vec<String> = (0..40)
        .map(|i| format!("s3://B/obj-{:02}.txt 2:hit {}", i, i))
        .collect();
    assert_eq!(lines, expected);
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_fetch_failure_reported_once() -> Result<()> {
    let dir = tempdir()?;
    create_bucket(&dir, "B", &[("ok", "first\nhas the match\n")])?;
    let bucket = dir.path().join("B");
    std::os::unix::fs::symlink(bucket.join("gone"), bucket.join("bad"))?;

    let output = s3grep(&dir)?
        .args(["grep", "-b", "B", "-j", "2", "--local-dir"])
        .arg(dir.path())
        .arg("match")
        .timeout(std::time::Duration::from_secs(30))
        .output()?;
    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout)?, "s3://B/ok 2:has the match\n");

    let stderr = String::from_utf8(output.stderr)?;
    let lines: Vec<_> = stderr.lines().collect();
    assert_eq!(lines.len(), 1, "{:?}", stderr);
    assert!(lines[0].ends_with(":bad"), "{:?}", stderr);
    Ok(())
}

#[test]
fn test_verbose_logging_completes() -> Result<()> {
    let dir = tempdir()?;
    let objects: Vec<(String, String)> = (0..10)
        .map(|i| (format!("obj-{}", i), "hit\n".repeat(20)))
        .collect();
    let refs: Vec<(&str, &str)> = objects
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    create_bucket(&dir, "B", &refs)?;

    let output = s3grep(&dir)?
        .args(["--log-level", "trace", "grep", "-b", "B", "-j", "4", "--local-dir"])
        .arg(dir.path())
        .arg("hit")
        .timeout(std::time::Duration::from_secs(30))
        .output()?;
    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout)?.lines().count(), 200);
    assert!(!output.stderr.is_empty());
    Ok(())
}

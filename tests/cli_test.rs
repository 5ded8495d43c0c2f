use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

type STDRESULT = Result<(), Box<dyn std::error::Error>>;

fn roundtrip_test(contents: &[u8], extra_args: &[&str]) -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = temp_dir.path().join("input.bin");
    let cmp_path = temp_dir.path().join("input.lzend");
    let out_path = temp_dir.path().join("output.bin");
    std::fs::write(&in_path, contents)?;

    Command::cargo_bin("topk-lzend")?
        .arg("compress")
        .arg("-i")
        .arg(&in_path)
        .arg("-o")
        .arg(&cmp_path)
        .args(extra_args)
        .assert()
        .success();

    Command::cargo_bin("topk-lzend")?
        .arg("expand")
        .arg("-i")
        .arg(&cmp_path)
        .arg("-o")
        .arg(&out_path)
        .assert()
        .success();

    let original = std::fs::read(&in_path)?;
    let expanded = std::fs::read(&out_path)?;
    assert_eq!(original, expanded);
    Ok(())
}

#[test]
fn roundtrips_empty_file() -> STDRESULT {
    roundtrip_test(b"", &[])
}

#[test]
fn roundtrips_small_text() -> STDRESULT {
    roundtrip_test(b"the quick brown fox jumps over the lazy dog", &[])
}

#[test]
fn roundtrips_repetitive_text() -> STDRESULT {
    let contents = b"ababbbabbabbbabbaa".repeat(50);
    roundtrip_test(&contents, &[])
}

#[test]
fn roundtrips_with_custom_topk_and_window() -> STDRESULT {
    let contents = b"to be or not to be, that is the question".repeat(20);
    roundtrip_test(&contents, &["-k", "256", "-w", "64"])
}

#[test]
fn rejects_k_below_minimum() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = temp_dir.path().join("input.bin");
    let out_path = temp_dir.path().join("input.lzend");
    std::fs::write(&in_path, b"some data")?;

    Command::cargo_bin("topk-lzend")?
        .arg("compress")
        .arg("-i")
        .arg(&in_path)
        .arg("-o")
        .arg(&out_path)
        .arg("-k")
        .arg("1")
        .assert()
        .failure();
    Ok(())
}

#[test]
fn rejects_corrupt_archive() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let bogus_path = temp_dir.path().join("bogus.lzend");
    let out_path = temp_dir.path().join("bogus.out");
    std::fs::write(&bogus_path, b"not a real archive")?;

    Command::cargo_bin("topk-lzend")?
        .arg("expand")
        .arg("-i")
        .arg(&bogus_path)
        .arg("-o")
        .arg(&out_path)
        .assert()
        .failure();
    Ok(())
}

#[test]
fn roundtrips_topk_lz78_method() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = temp_dir.path().join("input.bin");
    let cmp_path = temp_dir.path().join("input.topk");
    let out_path = temp_dir.path().join("output.bin");
    let contents = b"to be or not to be, that is the question".repeat(20);
    std::fs::write(&in_path, &contents)?;

    Command::cargo_bin("topk-lzend")?
        .arg("compress")
        .arg("-m")
        .arg("topk")
        .arg("-i")
        .arg(&in_path)
        .arg("-o")
        .arg(&cmp_path)
        .arg("-k")
        .arg("64")
        .assert()
        .success();

    Command::cargo_bin("topk-lzend")?
        .arg("expand")
        .arg("-m")
        .arg("topk")
        .arg("-i")
        .arg(&cmp_path)
        .arg("-o")
        .arg(&out_path)
        .assert()
        .success();

    let expanded = std::fs::read(&out_path)?;
    assert_eq!(contents, expanded);
    Ok(())
}

#[test]
fn help_mentions_compress_and_expand() -> STDRESULT {
    Command::cargo_bin("topk-lzend")?
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("compress").and(predicate::str::contains("expand")));
    Ok(())
}

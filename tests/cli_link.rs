use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

fn link() -> anyhow::Result<Command> {
    let mut cmd = Command::cargo_bin("nplink")?;
    cmd.arg("link")
        .arg("--strains")
        .arg("tests/nplink/strain_mappings.json")
        .arg("--gcf")
        .arg("tests/nplink/gcf.tsv")
        .arg("--spectra")
        .arg("tests/nplink/spectra.tsv")
        .arg("--mf")
        .arg("tests/nplink/mf.tsv");
    Ok(cmd)
}

#[test]
fn command_invalid() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("nplink")?;
    cmd.arg("foobar");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("recognized"));

    Ok(())
}

#[test]
fn command_link_metcalf() -> anyhow::Result<()> {
    let output = link()?.output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert_eq!(stdout.lines().count(), 5);
    assert!(stdout.starts_with("index\tgenomic_object_type\tgenomic_object_id"));
    assert!(stdout.contains("1\tGCF\tgcf1\tSpectrum\tspectrum1\t11.00\t-\t-\tstrain1\n"));
    assert!(stdout.contains("2\tGCF\tgcf1\tSpectrum\tspectrum3\t10.00\t-\t-\tstrain1,strain3\n"));
    assert!(stdout.contains("\tMolecularFamily\tfam1\t0.00\t"));
    assert!(stdout.contains("\tMolecularFamily\tsingleton-spectrum3\t10.00\t"));
    // MiBIG-only GCFs are left out
    assert!(!stdout.contains("gcf2"));

    Ok(())
}

#[test]
fn command_link_no_singletons() -> anyhow::Result<()> {
    let output = link()?.arg("--no-singletons").output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert_eq!(stdout.lines().count(), 4);
    assert!(!stdout.contains("singleton-spectrum3"));

    Ok(())
}

#[test]
fn command_link_standardised() -> anyhow::Result<()> {
    let output = link()?
        .arg("--standardised")
        .arg("--cutoff")
        .arg("0.5")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert_eq!(stdout.lines().count(), 2);
    assert!(stdout.contains("\tspectrum1\t0.71\t"));

    Ok(())
}

#[test]
fn command_link_hg() -> anyhow::Result<()> {
    let output = link()?
        .arg("--method")
        .arg("hg")
        .arg("--cutoff")
        .arg("0.7")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert_eq!(stdout.lines().count(), 2);
    assert!(stdout.contains("\tspectrum1\t-\t6.6667e-1\t-\tstrain1"));

    Ok(())
}

#[test]
fn command_link_methods() -> anyhow::Result<()> {
    let output = link()?
        .arg("--method")
        .arg("metcalf,likescore")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    // both methods on one line
    assert!(stdout.contains("\tspectrum1\t11.00\t-\t0.3935\t"));
    // likescore alone, nothing shared
    assert!(stdout.contains("\tspectrum2\t-\t-\t0.0000\t"));

    Ok(())
}

#[test]
fn command_link_common() -> anyhow::Result<()> {
    let output = link()?
        .arg("--common")
        .arg("--cutoff")
        .arg("5")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert_eq!(stdout.lines().count(), 5);
    assert!(stdout.contains("\tspectrum1\t10.00\t"));
    assert!(stdout.contains("\tspectrum3\t20.00\t-\t-\tstrain1,strain3"));

    Ok(())
}

#[test]
fn command_link_keep() -> anyhow::Result<()> {
    let output = link()?.arg("--keep").arg("S1,strain3").output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert_eq!(stdout.lines().count(), 5);
    assert!(!stdout.contains("spectrum2"));

    let mut cmd = link()?;
    cmd.arg("--keep").arg("strain9");
    cmd.assert().failure();

    Ok(())
}

#[test]
fn command_link_cache() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let first = link()?.arg("--cache").arg(dir.path()).output()?;
    assert!(dir.path().join("cache_metcalf_scoring.json").is_file());

    let second = link()?.arg("--cache").arg(dir.path()).output()?;
    assert_eq!(first.stdout, second.stdout);

    Ok(())
}

#[test]
fn command_link_outfile() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let outfile = dir.path().join("links.tsv");
    link()?.arg("-o").arg(&outfile).assert().success();

    let text = std::fs::read_to_string(&outfile)?;
    assert_eq!(text.lines().count(), 5);

    Ok(())
}

#[test]
fn command_link_bad_method() -> anyhow::Result<()> {
    let mut cmd = link()?;
    cmd.arg("--method").arg("rosetta");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unknown scoring method"));

    Ok(())
}

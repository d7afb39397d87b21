use std::fs;

use chrono::TimeZone;

use super::*;
use crate::dep::{Dep, Name, Op};

fn at(secs: u32) -> anyhow::Result<DateTime<Utc>> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, secs)
        .single()
        .ok_or_else(|| anyhow::anyhow!("ambiguous time"))
}

fn sample() -> anyhow::Result<Lockfile> {
    let directs: DirectMap = [
        (Name::try_from("foo")?, Dep::new(Op::Eq, "1.2.3")),
        (Name::try_from("widget")?, Dep::git("https://host/widget.git", "deadbeef")),
    ]
    .into_iter()
    .collect();
    let compiler = Compiler::new(
        "0.4.18",
        Axis::new(Platform::Linux, "3.11"),
        false,
        "requirements/override.txt",
        vec!["requirements/dev.in".into()],
    );
    let canonical = Compilation::new(compiler.clone(), at(0)?, "# nodeps\n# compilation\nfoo==1.2.3\n", directs.clone());

    let mut lock = Lockfile::new(&canonical, Some("abc".into()));
    for (secs, platform) in [(2, Platform::Windows), (1, Platform::Linux)] {
        let axis = Axis::new(platform, "3.11");
        lock.insert(&Compilation::new(
            compiler.on_axis(axis.clone()),
            at(secs)?,
            format!("# nodeps\n# compilation\nfoo==1.2.3\n{}-only==1\n", platform),
            directs.clone(),
        ));
    }
    Ok(lock)
}

#[test]
fn layout() -> anyhow::Result<()> {
    let text = sample()?.to_string_pretty()?;

    assert!(text.starts_with("{\n  \"direct\": {\n    \"time\": "), "{text}");
    assert!(text.ends_with("}\n"));

    let value: serde_json::Value = serde_json::from_str(&text)?;
    let keys: Vec<_> = value
        .as_object()
        .map(|o| o.keys().cloned().collect())
        .unwrap_or_default();
    assert_eq!(keys, ["direct", "linux_3.11", "windows_3.11"]);

    let direct = &value["direct"];
    assert_eq!(direct["resolver_version"], "0.4.18");
    assert_eq!(direct["project_platform"], "linux");
    assert_eq!(direct["project_runtime_version"], "3.11");
    assert_eq!(direct["no_deps"], false);
    assert_eq!(direct["high"], false);
    assert_eq!(direct["paths"][0], "requirements/dev.in");
    assert_eq!(direct["overrides"], "requirements/override.txt");
    assert_eq!(direct["directs"]["widget"]["op"], " @ ");
    assert_eq!(
        direct["requirements"],
        "foo==1.2.3\nwidget @ git+https://host/widget.git@deadbeef"
    );
    assert_eq!(direct["inputs"], "abc");
    assert_eq!(value["windows_3.11"]["time"], "2024-05-01T12:30:02Z");
    Ok(())
}

#[test]
fn load_round_trips_written_document() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("lock.json");
    let lock = sample()?;

    assert_eq!(Lockfile::load(&path)?, None);
    lock.write_atomic(&path)?;
    let loaded = Lockfile::load(&path)?.ok_or_else(|| anyhow::anyhow!("lockfile missing"))?;
    assert_eq!(loaded, lock);
    assert_eq!(loaded.compiler(), lock.compiler());

    let windows = loaded
        .compilation(&Axis::new(Platform::Windows, "3.11"))
        .ok_or_else(|| anyhow::anyhow!("axis missing"))?;
    assert!(windows.is_valid());
    assert_eq!(windows.compiler().axis().platform, Platform::Windows);
    assert_eq!(windows.directs(), loaded.directs());
    assert!(loaded.compilation(&Axis::new(Platform::Macos, "3.11")).is_none());

    // nothing but the lockfile is left behind in the directory
    let entries = fs::read_dir(dir.path())?.collect::<std::io::Result<Vec<_>>>()?;
    assert_eq!(entries.len(), 1);
    Ok(())
}

#[test]
fn documents_without_fingerprint_are_readable() -> anyhow::Result<()> {
    let mut value: serde_json::Value = serde_json::from_str(&sample()?.to_string_pretty()?)?;
    if let Some(direct) = value["direct"].as_object_mut() {
        direct.remove("inputs");
    }
    let lock: Lockfile = serde_json::from_value(value)?;
    assert_eq!(lock.inputs(), None);
    Ok(())
}

#[test]
fn empty_and_malformed_documents_are_corrupt() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("lock.json");

    for text in ["", "  \n", "{}", "{\"direct\": {}}", "not json"] {
        fs::write(&path, text)?;
        let err = Lockfile::load(&path).unwrap_err();
        assert!(err.is_recoverable(), "{text:?}: {err}");
    }
    Ok(())
}

#[test]
fn empty_axis_text_is_not_valid() -> anyhow::Result<()> {
    let mut value: serde_json::Value = serde_json::from_str(&sample()?.to_string_pretty()?)?;
    value["linux_3.11"]["requirements"] = "".into();
    let lock: Lockfile = serde_json::from_value(value)?;

    let linux = lock
        .compilation(&Axis::new(Platform::Linux, "3.11"))
        .ok_or_else(|| anyhow::anyhow!("axis missing"))?;
    assert!(!linux.is_valid());
    Ok(())
}

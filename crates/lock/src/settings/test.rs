use std::fs;

use super::*;

fn project() -> anyhow::Result<tempfile::TempDir> {
    let dir = tempfile::tempdir()?;
    fs::create_dir_all(dir.path().join("requirements"))?;
    fs::write(
        dir.path().join("requirements/dev.in"),
        "-e packages/core\n--editable packages/plot  \nrequests>=2\n",
    )?;
    Ok(dir)
}

#[test]
fn source_paths_follow_editables() -> anyhow::Result<()> {
    let dir = project()?;
    let settings = Settings::new(&Config::default(), dir.path())?;

    assert_eq!(
        settings.source_paths()?,
        [
            "requirements/dev.in",
            "packages/core/pyproject.toml",
            "packages/plot/pyproject.toml",
        ]
    );
    assert_eq!(settings.overrides(), "requirements/override.txt");
    Ok(())
}

#[test]
fn missing_requirements_file_is_reported() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let settings = Settings::new(&Config::default(), dir.path())?;
    let err = settings.source_paths().unwrap_err();
    assert!(matches!(err, Error::Read { .. }), "{err}");
    Ok(())
}

#[test]
fn matrix_is_sorted_product() -> anyhow::Result<()> {
    let dir = project()?;
    let settings = Settings::new(&Config::default(), dir.path())?;
    let keys: Vec<_> = settings.matrix().iter().map(Axis::key).collect();

    assert_eq!(keys.len(), 12);
    assert_eq!(keys[..4], ["linux_3.10", "linux_3.11", "linux_3.12", "linux_3.9"]);
    assert_eq!(keys.last().map(String::as_str), Some("windows_3.9"));
    Ok(())
}

#[test]
fn versions_file_overrides_matrix() -> anyhow::Result<()> {
    let dir = project()?;
    fs::write(dir.path().join(".python-versions"), "3.12\n\n3.11\n")?;
    let mut config = Config::default();
    config.matrix.platforms = vec![Platform::Windows, Platform::Linux];
    let settings = Settings::new(&config, dir.path())?;

    let keys: Vec<_> = settings.matrix().iter().map(Axis::key).collect();
    assert_eq!(keys, ["linux_3.11", "linux_3.12", "windows_3.11", "windows_3.12"]);
    Ok(())
}

#[test]
fn nodeps_lines_are_trimmed() -> anyhow::Result<()> {
    let dir = project()?;
    let settings = Settings::new(&Config::default(), dir.path())?;
    assert!(settings.nodeps()?.is_empty());

    fs::write(dir.path().join("requirements/nodeps.in"), "  foo==1.0\n\nbar @ git+https://h/bar@1  \n")?;
    assert_eq!(settings.nodeps()?, ["foo==1.0", "bar @ git+https://h/bar@1"]);
    Ok(())
}

#[test]
fn lockfile_paths() -> anyhow::Result<()> {
    let dir = project()?;
    let settings = Settings::new(&Config::default(), dir.path())?;
    assert_eq!(settings.lockfile(false), dir.path().join("lock.json"));
    assert_eq!(settings.lockfile(true), dir.path().join("lock-high.json"));
    Ok(())
}

#[test]
fn explicit_running_axis_wins() -> anyhow::Result<()> {
    let dir = project()?;
    let settings = Settings::new(&Config::default(), dir.path())?;
    let axis = settings.running_axis(Some(Platform::Macos), Some("3.10".into()));
    assert_eq!(axis, Axis::new(Platform::Macos, "3.10"));
    Ok(())
}

#[test]
fn runtime_banners() {
    assert_eq!(parse_runtime_version("Python 3.11.4\n"), Some("3.11".into()));
    assert_eq!(parse_runtime_version("Python 3.12.0rc1"), Some("3.12".into()));
    assert_eq!(parse_runtime_version("Python"), None);
    assert_eq!(parse_runtime_version("Python three.eleven"), None);
    assert_eq!(probe_runtime_version("definitely-not-an-interpreter-xyz"), None);
}

use std::cell::RefCell;
use std::fs;

use config::Config;

use super::*;
use crate::compiler::Axis;
use crate::dep::{Dep, Name, Op};

struct Recording {
    seen: RefCell<Vec<(Vec<String>, Option<String>)>>,
}

impl Resolver for Recording {
    fn version(&self) -> Result<String> {
        Ok("0.4.18".into())
    }

    fn run(&self, args: &[String]) -> Result<String> {
        let constraints = args
            .iter()
            .position(|a| a == "--constraint")
            .and_then(|i| fs::read_to_string(&args[i + 1]).ok());
        self.seen.borrow_mut().push((args.to_vec(), constraints));
        Ok("attrs==23.1.0\n    # via foo\nfoo==1.0\n\n".into())
    }
}

fn settings(dir: &std::path::Path) -> anyhow::Result<Settings> {
    fs::create_dir_all(dir.join("requirements"))?;
    fs::write(dir.join("requirements/dev.in"), "foo>=1\n")?;
    fs::write(dir.join("requirements/nodeps.in"), "  bar==2.0 \n\n")?;
    Ok(Settings::new(&Config::default(), dir)?)
}

#[test]
fn renders_declaration_block() {
    let text = render(&["bar==2.0".into()], "foo==1.0\n\n");
    insta::assert_snapshot!(text, @r"
    # nodeps
    bar==2.0
    # compilation
    foo==1.0
    ");
    assert_eq!(render(&[], ""), "# nodeps\n# compilation\n");
}

#[test]
fn pins_directs_through_constraints_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let settings = settings(dir.path())?;
    let compiler = Compiler::new(
        "0.4.18",
        Axis::new(config::Platform::Macos, "3.12"),
        false,
        settings.overrides(),
        settings.source_paths()?,
    );
    let pinned: DirectMap = [(Name::try_from("foo")?, Dep::new(Op::Eq, "1.0"))]
        .into_iter()
        .collect();
    let resolver = Recording {
        seen: RefCell::new(Vec::new()),
    };

    let output = invoke(&resolver, &settings, &compiler, Some(&pinned))?;
    assert_eq!(
        output.requirements,
        "# nodeps\nbar==2.0\n# compilation\nattrs==23.1.0\n    # via foo\nfoo==1.0\n"
    );

    let seen = resolver.seen.borrow();
    let (args, constraints) = &seen[0];
    assert_eq!(constraints.as_deref(), Some("foo==1.0\n"));
    assert_eq!(args.last().map(String::as_str), Some("requirements/dev.in"));

    // the constraints file is gone once the run is over
    let pos = args.iter().position(|a| a == "--constraint");
    let path = pos.map(|i| std::path::PathBuf::from(&args[i + 1]));
    assert!(path.is_some_and(|p| !p.exists()));

    drop(seen);
    invoke(&resolver, &settings, &compiler, None)?;
    let seen = resolver.seen.borrow();
    assert!(!seen[1].0.iter().any(|a| a == "--constraint"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn process_resolver_reports_failures_verbatim() -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir()?;
    let mut config = Config::default();
    config.resolver.program = "bin/fake-uv".into();
    let settings = Settings::new(&config, dir.path())?;

    fs::create_dir_all(dir.path().join("bin"))?;
    let script = dir.path().join("bin/fake-uv");
    fs::write(
        &script,
        "#!/bin/sh\n\
         if [ \"$1\" = \"--version\" ]; then echo 'uv 0.4.18 (abc 2024-05-01)'; exit 0; fi\n\
         if [ \"$1\" = \"fail\" ]; then echo 'no solution found' >&2; exit 2; fi\n\
         pwd\n",
    )?;
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755))?;

    let resolver = ProcessResolver::new(&settings);
    assert_eq!(resolver.version()?, "0.4.18");

    let cwd = resolver.run(&["compile".into()])?;
    assert_eq!(
        fs::canonicalize(cwd.trim())?,
        fs::canonicalize(dir.path())?
    );

    match resolver.run(&["fail".into()]) {
        Err(Error::ResolutionFailed { code, stderr }) => {
            assert_eq!(code, Some(2));
            assert_eq!(stderr, "no solution found\n");
        },
        other => anyhow::bail!("unexpected result: {other:?}"),
    }
    Ok(())
}

#[test]
fn missing_program_fails_to_spawn() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let settings = Settings::new(&Config::default(), dir.path())?;
    let err = ProcessResolver::new(&settings).version().unwrap_err();
    assert!(matches!(err, Error::Spawn { .. }), "{err}");
    Ok(())
}

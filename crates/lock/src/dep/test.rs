//! Tests for package names, operators and the direct-dependency map.

use super::*;

#[test]
fn name_edge_cases() {
    assert_eq!(Name::try_from("a"), Ok(Name("a".into())));
    assert_eq!(Name::try_from("zope.interface"), Ok(Name("zope.interface".into())));
    assert_eq!(Name::try_from("typing_extensions"), Ok(Name("typing_extensions".into())));
    assert_eq!(Name::try_from("9lives"), Ok(Name("9lives".into())));
}

#[test]
fn empty_name() {
    assert_eq!(Name::try_from(""), Err(NameError::Empty));
}

#[test]
fn invalid_start_and_end() {
    for s in ["-foo", "_foo", ".foo"] {
        let first = s.chars().next().unwrap();
        assert_eq!(Name::try_from(s), Err(NameError::InvalidStart(first)), "{s}");
    }
    for s in ["foo-", "foo_", "foo."] {
        let last = s.chars().last().unwrap();
        assert_eq!(Name::try_from(s), Err(NameError::InvalidEnd(last)), "{s}");
    }
}

#[test]
fn invalid_chars() {
    assert_eq!(
        Name::try_from("foo bar!"),
        Err(NameError::InvalidCharacters(" !".into()))
    );
    assert_eq!(
        Name::try_from("café"),
        Err(NameError::InvalidCharacters("é".into()))
    );
}

#[test]
fn name_from_str_wraps_error() {
    let err = "-x".parse::<Name>().unwrap_err();
    assert!(matches!(err, Error::InvalidName { ref name, .. } if name == "-x"));
}

#[test]
fn longest_operator_wins() {
    assert_eq!(Op::split_prefix("===1.0"), Some((Op::ArbitraryEq, "1.0")));
    assert_eq!(Op::split_prefix("==1.0"), Some((Op::Eq, "1.0")));
    assert_eq!(Op::split_prefix(">=1.0"), Some((Op::Ge, "1.0")));
    assert_eq!(Op::split_prefix(">1.0"), Some((Op::Gt, "1.0")));
    assert_eq!(Op::split_prefix(" @ git+x"), Some((Op::Url, "git+x")));
    assert_eq!(Op::split_prefix("=1.0"), None);
    assert_eq!(Op::split_prefix("@git+x"), None);
}

#[test]
fn op_serializes_as_text() -> anyhow::Result<()> {
    let dep = Dep::new(Op::Url, "git+https://x/y@abc123");
    let json = serde_json::to_string(&dep)?;
    assert_eq!(json, r#"{"op":" @ ","rev":"git+https://x/y@abc123"}"#);
    assert_eq!(serde_json::from_str::<Dep>(&json)?, dep);
    assert!(serde_json::from_str::<Dep>(r#"{"op":"=","rev":"1"}"#).is_err());
    Ok(())
}

#[test]
fn insert_unique_rejects_conflicts() -> anyhow::Result<()> {
    let mut map = DirectMap::default();
    let foo = Name::try_from("foo")?;
    map.insert_unique(foo.clone(), Dep::new(Op::Eq, "1.0"))?;
    map.insert_unique(foo.clone(), Dep::new(Op::Eq, "1.0"))?;
    let err = map
        .insert_unique(foo, Dep::new(Op::Eq, "2.0"))
        .unwrap_err();
    assert!(matches!(err, Error::ConflictingDirect { .. }));
    assert_eq!(map.len(), 1);
    Ok(())
}

#[test]
fn layered_top_wins() -> anyhow::Result<()> {
    let base: DirectMap = [
        (Name::try_from("widget")?, Dep::git("https://host/widget.git", "aaa")),
        (Name::try_from("gadget")?, Dep::git("https://host/gadget.git", "bbb")),
    ]
    .into_iter()
    .collect();
    let top: DirectMap = [(Name::try_from("widget")?, Dep::new(Op::Eq, "1.0"))]
        .into_iter()
        .collect();

    let merged = base.layered(top);
    assert_eq!(merged.get("widget"), Some(&Dep::new(Op::Eq, "1.0")));
    assert_eq!(merged.get("gadget").map(Dep::op), Some(Op::Url));
    assert_eq!(
        merged.to_requirements(),
        "gadget @ git+https://host/gadget.git@bbb\nwidget==1.0"
    );
    Ok(())
}

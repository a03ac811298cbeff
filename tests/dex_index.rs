mod common;

use common::DexBuilder;
use dex_method_diff::cli::OutputFormat;
use dex_method_diff::config::RunConfig;
use dex_method_diff::dex::{DexError, DexIndex, MethodRecord};
use dex_method_diff::pipeline::{load_snapshot, run};

#[test]
fn reads_class_defs_and_method_ids() {
    let bytes = DexBuilder::new()
        .class("Lcom/a/Foo;")
        .method("Lcom/a/Foo;", "bar", &["I", "[Ljava/lang/String;"], "V")
        .method("Ljava/lang/Object;", "<init>", &[], "V")
        .build();

    let index = DexIndex::parse(&bytes, "test.dex").unwrap();
    assert_eq!(index.class_descriptors(), ["Lcom/a/Foo;".to_string()]);
    assert_eq!(
        index.method_refs(),
        [
            MethodRecord {
                declaring_class: "Lcom/a/Foo;".to_string(),
                name: "bar".to_string(),
                descriptor: "(I[Ljava/lang/String;)V".to_string(),
            },
            MethodRecord {
                declaring_class: "Ljava/lang/Object;".to_string(),
                name: "<init>".to_string(),
                descriptor: "()V".to_string(),
            },
        ]
    );
}

#[test]
fn truncated_images_are_format_errors() {
    let bytes = DexBuilder::new()
        .class("Lcom/a/Foo;")
        .method("Lcom/a/Foo;", "bar", &["I"], "V")
        .build();

    let err = DexIndex::parse(&bytes[..0x78], "cut.dex").unwrap_err();
    assert!(matches!(err, DexError::Malformed { .. }));
    assert!(err.to_string().starts_with("cut.dex: "));
}

#[test]
fn snapshot_of_a_raw_image() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("classes.dex");
    DexBuilder::new()
        .class("Lcom/a/Foo;")
        .method("Lcom/a/Foo;", "bar", &["I", "[Ljava/lang/String;"], "V")
        .method("Lcom/a/Foo;", "access$000", &["Lcom/a/Foo;"], "I")
        .write_to(&path)?;

    let (snapshot, images) = load_snapshot(&path)?;
    assert_eq!(images, 1);
    assert_eq!(
        snapshot.methods.into_iter().collect::<Vec<_>>(),
        vec!["void com.a.Foo.bar(int, java.lang.String[])"]
    );
    assert_eq!(
        snapshot.classes.into_iter().collect::<Vec<_>>(),
        vec!["com.a.Foo"]
    );
    Ok(())
}

#[test]
fn snapshot_merges_every_dex_in_an_archive() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let apk = dir.path().join("app.apk");
    let first = DexBuilder::new()
        .class("LA;")
        .method("LA;", "m", &[], "V")
        .build();
    let second = DexBuilder::new()
        .class("LB;")
        .method("LB;", "n", &["J"], "Z")
        .build();
    common::write_zip(
        &apk,
        &[
            ("AndroidManifest.xml", b"<manifest/>".as_slice()),
            ("classes.dex", first.as_slice()),
            ("classes2.dex", second.as_slice()),
        ],
    )?;

    let (snapshot, images) = load_snapshot(&apk)?;
    assert_eq!(images, 2);
    assert_eq!(snapshot.classes.len(), 2);
    assert!(snapshot.methods.contains("void A.m()"));
    assert!(snapshot.methods.contains("boolean B.n(long)"));
    Ok(())
}

#[test]
fn inputs_are_hashed_only_for_json() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("classes.dex");
    DexBuilder::new()
        .class("LA;")
        .method("LA;", "m", &[], "V")
        .write_to(&path)?;

    let mut config = RunConfig {
        inputs: vec![path],
        mappings: Vec::new(),
        format: OutputFormat::Text,
    };
    let mut out = Vec::new();
    let summary = run(&config, &mut out)?;
    assert_eq!(summary.inputs[0].sha256, None);

    config.format = OutputFormat::Json;
    let mut out = Vec::new();
    let summary = run(&config, &mut out)?;
    assert_eq!(summary.inputs[0].sha256.as_deref().map(str::len), Some(64));
    Ok(())
}

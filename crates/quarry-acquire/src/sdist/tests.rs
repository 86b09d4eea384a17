use super::*;
use crate::process::CommandOutput;
use async_trait::async_trait;
use std::sync::Mutex;
use tempfile::TempDir;

/// Pretends to be `python -m build`, dropping tarballs into `--outdir`
struct FakeBuild {
    tarballs: Vec<&'static str>,
    fail: bool,
    calls: Mutex<Vec<Vec<OsString>>>,
}

impl FakeBuild {
    fn producing(tarballs: &[&'static str]) -> Self {
        Self {
            tarballs: tarballs.to_vec(),
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CommandRunner for FakeBuild {
    async fn run(
        &self,
        program: &str,
        args: &[OsString],
        _stderr_level: OutputLevel,
    ) -> AcquireResult<CommandOutput> {
        let mut call = vec![OsString::from(program)];
        call.extend(args.iter().cloned());
        self.calls.lock().unwrap().push(call);

        if self.fail {
            return Err(QuarryError::CommandFailed {
                command: program.to_string(),
                reason: "No module named build".to_string(),
            });
        }
        if program == "python" {
            let outdir = PathBuf::from(&args[4]);
            for name in &self.tarballs {
                std::fs::write(outdir.join(name), b"sdist").unwrap();
            }
        }
        Ok(CommandOutput::default())
    }
}

#[tokio::test]
async fn test_create_sdist_returns_single_tarball() {
    let work = TempDir::new().unwrap();
    let source = work.path().join("ansible-core");
    std::fs::create_dir(&source).unwrap();

    let runner = FakeBuild::producing(&["ansible_core-2.17.0.dev0.tar.gz", "build.log"]);
    let sdist = create_sdist(&runner, &source, work.path()).await.unwrap();

    assert_eq!(
        sdist.file_name().unwrap().to_string_lossy(),
        "ansible_core-2.17.0.dev0.tar.gz"
    );
    let dist_dir = sdist.parent().unwrap();
    assert_eq!(dist_dir.parent().unwrap(), work.path());
    assert!(dist_dir
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("ansible-core"));

    let calls = runner.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0][0], "python");
    assert_eq!(calls[0][1..4], [OsString::from("-m"), OsString::from("build"), OsString::from("--sdist")]);
    assert_eq!(calls[0][6], source.as_os_str());
}

#[tokio::test]
async fn test_create_sdist_without_tarball() {
    let work = TempDir::new().unwrap();
    let runner = FakeBuild::producing(&[]);
    let err = create_sdist(&runner, work.path(), work.path()).await.unwrap_err();
    assert!(matches!(err, QuarryError::CannotBuild { .. }));
    assert!(err.to_string().ends_with("did not create a tar.gz"));
}

#[tokio::test]
async fn test_create_sdist_with_several_tarballs() {
    let work = TempDir::new().unwrap();
    let runner = FakeBuild::producing(&["a-1.0.tar.gz", "b-1.0.tar.gz"]);
    let err = create_sdist(&runner, work.path(), work.path()).await.unwrap_err();
    assert!(err.to_string().contains("more than one tar.gz"));
}

#[tokio::test]
async fn test_build_tool_failure_is_wrapped() {
    let work = TempDir::new().unwrap();
    let runner = FakeBuild {
        fail: true,
        ..FakeBuild::producing(&[])
    };
    let err = create_sdist(&runner, work.path(), work.path()).await.unwrap_err();
    match err {
        QuarryError::CannotBuild { reason, .. } => assert!(reason.contains("No module named build")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_checkout_from_git() {
    let work = TempDir::new().unwrap();
    let runner = FakeBuild::producing(&[]);
    let checkout = checkout_from_git(&runner, work.path(), "https://github.com/ansible/ansible/", "ansible-core")
        .await
        .unwrap();

    assert_eq!(checkout, work.path().join("ansible-core"));
    let calls = runner.calls.lock().unwrap();
    assert_eq!(
        calls[0],
        vec![
            OsString::from("git"),
            OsString::from("clone"),
            OsString::from("https://github.com/ansible/ansible/"),
            checkout.into_os_string(),
        ]
    );
}

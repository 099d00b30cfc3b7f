use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tarsync::config::ExclusionSet;
use tarsync::sync::{self, SyncOptions};
use tempfile::tempdir;

/// A stand-in rsync that floods stderr well past the pipe buffer before
/// printing its summary, the way a permission-denied tree does.
const NOISY_RSYNC: &str = "#!/bin/sh
i=0
while [ $i -lt 4096 ]; do
    echo \"rsync: opendir \\\"/proc/$i\\\" failed: Permission denied (13)\" >&2
    i=$((i+1))
done
echo \"sent 100 bytes  received 20 bytes  80.00 bytes/sec\"
echo \"total size is 1,000  speedup is 8.33\"
exit 0
";

// This test owns the whole file: it rewrites PATH for the process, which
// must not race other tests in the same binary.
#[test]
fn stderr_flood_does_not_stall_the_sync() {
    let bin = tempdir().unwrap();
    let fake = bin.path().join("rsync");
    fs::write(&fake, NOISY_RSYNC).unwrap();
    fs::set_permissions(&fake, fs::Permissions::from_mode(0o755)).unwrap();
    std::env::set_var("PATH", bin.path());

    let work = tempdir().unwrap();
    let source = work.path().join("source");
    let destination = work.path().join("destination");
    fs::create_dir(&source).unwrap();
    fs::create_dir(&destination).unwrap();

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(sync::run(
            &source,
            &destination,
            &ExclusionSet::new(Vec::new()),
            SyncOptions::default(),
        ));
    });

    let summary = rx
        .recv_timeout(Duration::from_secs(30))
        .expect("sync must finish even when stderr floods")
        .unwrap();
    assert_eq!(summary.total_size, 1_000);
    assert!(!summary.dry_run);
}

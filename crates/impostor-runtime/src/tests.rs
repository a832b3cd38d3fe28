use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
#[cfg(unix)]
use std::sync::{Mutex, MutexGuard, PoisonError};

use impostor_core::{append_descriptor, TargetDescriptor, DESCRIPTOR_VERSION, TRAILER_MAGIC};

use super::*;

fn descriptor(impostor: &str, impostor_args: &[&str], include_arg_zero: bool) -> TargetDescriptor {
    TargetDescriptor {
        version: DESCRIPTOR_VERSION.to_string(),
        original_command: PathBuf::from("/usr/bin/tool-0123"),
        impostor_command: impostor.to_string(),
        impostor_args: impostor_args.iter().map(|arg| arg.to_string()).collect(),
        include_arg_zero,
    }
}

fn os_args(args: &[&str]) -> Vec<OsString> {
    args.iter().map(OsString::from).collect()
}

#[test]
fn impostor_args_drop_invoked_name_by_default() {
    let descriptor = descriptor("wrapper", &["-x"], false);
    assert_eq!(
        impostor_args(&descriptor, &os_args(&["prog", "a", "b"])),
        os_args(&["-x", "a", "b"])
    );
}

#[test]
fn impostor_args_keep_invoked_name_when_requested() {
    let descriptor = descriptor("wrapper", &["-x"], true);
    assert_eq!(
        impostor_args(&descriptor, &os_args(&["prog", "a", "b"])),
        os_args(&["-x", "prog", "a", "b"])
    );
}

#[test]
fn impostor_args_tolerate_missing_process_args() {
    let descriptor = descriptor("wrapper", &["-x", "-y"], false);
    assert_eq!(impostor_args(&descriptor, &[]), os_args(&["-x", "-y"]));
}

#[test]
fn descriptor_of_plain_file_is_none() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("plain");
    fs::write(&path, b"just a program").expect("write file");

    assert!(descriptor_of(&path).expect("plain file is readable").is_none());
}

#[test]
fn descriptor_of_impostor_returns_embedded_descriptor() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("impostor");
    fs::write(&path, b"image bytes").expect("write image");
    let expected = descriptor("wrapper", &["--flag"], true);
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(&path)
        .expect("open image");
    append_descriptor(&mut file, &expected).expect("append descriptor");
    drop(file);

    assert_eq!(descriptor_of(&path).expect("decode"), Some(expected));
}

#[test]
fn descriptor_of_corrupt_trailer_is_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("corrupt");
    let mut bytes = b"image".to_vec();
    bytes.extend_from_slice(&1000_u32.to_be_bytes());
    bytes.extend_from_slice(TRAILER_MAGIC);
    fs::write(&path, bytes).expect("write corrupt file");

    let err = descriptor_of(&path).expect_err("corrupt trailer must fail");
    assert!(format!("{err:#}").contains("corrupt"), "got {err:#}");
}

#[test]
fn dispatch_refuses_to_launch_when_cancelled() {
    let dir = tempfile::tempdir().expect("tempdir");
    let marker = dir.path().join("ran");
    let script = format!("touch '{}'", marker.display());
    let descriptor = descriptor(&current_shell(), &["-c", &script], false);

    let err = dispatch(&descriptor, &os_args(&["prog"]), &AtomicBool::new(true))
        .expect_err("cancelled dispatch must fail");

    assert!(err.to_string().contains("cancelled"), "got {err:#}");
    assert!(!marker.exists());
}

#[test]
fn dispatch_reports_unknown_impostor_command() {
    let descriptor = descriptor("impostorcmd-test-no-such-command", &[], false);
    let err = dispatch(&descriptor, &os_args(&["prog"]), &AtomicBool::new(false))
        .expect_err("unknown impostor must fail");
    assert!(
        err.to_string().contains("impostorcmd-test-no-such-command"),
        "got {err:#}"
    );
}

// Signals reach every relay in the process, so tests that run children take
// turns.
#[cfg(unix)]
static CHILDREN: Mutex<()> = Mutex::new(());

#[cfg(unix)]
fn children_lock() -> MutexGuard<'static, ()> {
    CHILDREN.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(unix)]
fn current_shell() -> String {
    "/bin/sh".to_string()
}

#[cfg(not(unix))]
fn current_shell() -> String {
    "cmd".to_string()
}

#[cfg(unix)]
#[test]
fn dispatch_propagates_child_exit_code() {
    let _children = children_lock();
    let descriptor = descriptor("/bin/sh", &["-c", "exit 7"], false);
    let code = dispatch(&descriptor, &os_args(&["prog"]), &AtomicBool::new(false))
        .expect("dispatch must run child");
    assert_eq!(code, 7);
}

#[cfg(unix)]
#[test]
fn dispatch_maps_signal_death_to_shell_convention() {
    let _children = children_lock();
    let descriptor = descriptor("/bin/sh", &["-c", "kill -KILL $$"], false);
    let code = dispatch(&descriptor, &os_args(&["prog"]), &AtomicBool::new(false))
        .expect("dispatch must run child");
    assert_eq!(code, 128 + 9);
}

#[cfg(unix)]
#[test]
fn dispatch_forwards_arguments_and_original_command() {
    let _children = children_lock();
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("out");
    let script = format!(
        "printf '%s\\n' \"${ORIGINAL_COMMAND_ENV}\" \"$@\" > \"$1\""
    );
    let descriptor = descriptor("/bin/sh", &["-c", &script, "sh"], false);
    let args = vec![
        OsString::from("prog"),
        out.clone().into_os_string(),
        OsString::from("second arg"),
    ];

    let code = dispatch(&descriptor, &args, &AtomicBool::new(false)).expect("dispatch");

    assert_eq!(code, 0);
    let written = fs::read_to_string(&out).expect("child output");
    assert_eq!(
        written,
        format!("/usr/bin/tool-0123\n{}\nsecond arg\n", out.display())
    );
}

#[cfg(unix)]
#[test]
fn dispatch_relays_signals_to_child() {
    use std::thread;
    use std::time::{Duration, Instant};

    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let _children = children_lock();
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("out");
    let ready = dir.path().join("ready");
    let script = "trap 'echo got > \"$1\"; exit 3' USR1; : > \"$2\"; \
                  i=0; while [ $i -lt 100 ]; do sleep 0.1; i=$((i+1)); done";
    let descriptor = descriptor("/bin/sh", &["-c", script, "sh"], false);
    let args = vec![
        OsString::from("prog"),
        out.clone().into_os_string(),
        ready.clone().into_os_string(),
    ];

    let sender = thread::spawn(move || {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !ready.exists() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
        }
        // The relay registers right after the child starts.
        thread::sleep(Duration::from_millis(300));
        kill(Pid::this(), Signal::SIGUSR1).expect("signal dispatcher");
    });

    let code = dispatch(&descriptor, &args, &AtomicBool::new(false)).expect("dispatch");
    sender.join().expect("signal sender");

    assert_eq!(code, 3);
    assert_eq!(fs::read_to_string(&out).expect("trap output"), "got\n");
}

//! The logger is process-wide, so it gets its own test binary.

use core::fmt;
use std::sync::Mutex;

use andromeda::{error::Errno, kinfo, kwarn, logging};

static CAPTURED: Mutex<String> = Mutex::new(String::new());

fn capture(args: fmt::Arguments) {
    use fmt::Write;
    CAPTURED.lock().unwrap().write_fmt(args).unwrap();
}

#[test]
fn test_logger_records() {
    logging::init_env_logger().unwrap();
    assert_eq!(logging::init_env_logger(), Err(Errno::EBUSY));
    logging::set_console(capture);

    log::info!("devfs ready");
    kwarn!("numset {} exhausted", 3);
    log::trace!("hidden at the default level");

    let dmesg = String::from_utf8(logging::dmesg()).unwrap();
    assert!(dmesg.contains("[ INFO] devfs ready\n"));
    assert!(dmesg.contains("numset 3 exhausted"));
    assert!(dmesg.contains("test_logger_records"));
    assert!(!dmesg.contains("hidden"));

    let console = CAPTURED.lock().unwrap().clone();
    assert!(console.contains("\u{1B}[37m[ INFO] devfs ready\n\u{1B}[0m"));
    assert!(console.contains("\u{1B}[33m"));

    kinfo!("after {}", "capture");
    assert!(String::from_utf8(logging::dmesg()).unwrap().contains("after capture"));
}

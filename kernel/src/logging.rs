//! Implement logger instance. Every record is kept in the kernel ring buffer and, once a console has been
//! attached with [`set_console`], echoed to it.

use crate::{
    error::{Errno, KResult},
    sync::mutex::SpinLock as Mutex,
    LOG_LEVEL,
};
use alloc::{format, vec::Vec};
use core::fmt;
use lazy_static::lazy_static;
use log::{Level, LevelFilter, Log, Metadata, Record};
use ringbuf::{HeapRb, Rb};
use spin::RwLock;

pub const RING_BUF_LEN: usize = u16::MAX as _;

/// Sink for console output, e.g., the serial port driver.
pub type ConsoleWriter = fn(fmt::Arguments);

lazy_static! {
    /// Lock the logger instance.
    static ref LOG_LOCK: Mutex<()> = Mutex::new(());
    /// The kernel ring buffer for storing the kernel messages after the kernel is successfully booted.
    /// Useful for the `dmesg` command.
    pub static ref RING_BUFFER: RwLock<HeapRb<u8>> = RwLock::new(HeapRb::new(RING_BUF_LEN));
}

static CONSOLE: RwLock<Option<ConsoleWriter>> = RwLock::new(None);

/// An instance that logs the information into console created by the kernel.
/// This logger cannot be directly manipulated. The kernel must use macros provided
/// by the `log` crate.
struct EnvLogger;

impl Log for EnvLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn flush(&self) {}

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let line = format!("[{:>5}] {}\n", record.level(), record.args());
            ringbuf_log_raw(line.as_bytes());
            color_print(format_args!("{}", line), record.level());
        }
    }
}

/// Converts the `OS_LOG_LEVEL` setting into a filter. Unknown values disable logging.
pub fn level_filter(level: &str) -> LevelFilter {
    match level {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Off,
    }
}

/// Initializes the envrionment logger.
///
/// The logger relies on the [log](https://crates.io/crates/log) crate for providing all the logging macros.
pub fn init_env_logger() -> KResult<()> {
    static ENV_LOGGER: EnvLogger = EnvLogger;
    // Register this logger into `log`.
    if log::set_logger(&ENV_LOGGER).is_err() {
        return Err(Errno::EBUSY);
    }

    log::set_max_level(level_filter(LOG_LEVEL.as_str()));

    Ok(())
}

/// Attaches the console. Replaces the previous one, if any.
pub fn set_console(writer: ConsoleWriter) {
    *CONSOLE.write() = Some(writer);
}

/// Returns a copy of the kernel ring buffer.
pub fn dmesg() -> Vec<u8> {
    RING_BUFFER.read().iter().copied().collect()
}

/// Prints the name of the function that invokes this macro.
#[macro_export]
macro_rules! function {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            core::any::type_name::<T>()
        }
        let name = type_name_of(f);
        &name[..name.len() - 3]
    }};
}

/// From std::println!
///
/// Prints to the console, with a newline.
#[macro_export]
macro_rules! println {
    () => {
        $crate::print!("\n")
    };
    ($($arg:tt)*) => {{
        $crate::print!("{}\n", format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! kinfo {
    ($($arg:tt)*) => {{
        log::info!("[{}@L{}] {}", $crate::function!(), line!(), format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! kerror {
    ($($arg:tt)*) => {{
        log::error!("[{}@L{}] {}", $crate::function!(), line!(), format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! kdebug {
    ($($arg:tt)*) => {{
        log::debug!("[{}@L{}] {}", $crate::function!(), line!(), format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! ktrace {
    ($($arg:tt)*) => {{
        log::trace!("[{}@L{}] {}", $crate::function!(), line!(), format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! kwarn {
    ($($arg:tt)*) => {{
        log::warn!("[{}@L{}] {}", $crate::function!(), line!(), format_args!($($arg)*));
    }};
}

pub(crate) fn ringbuf_log_raw(data: &[u8]) {
    let mut lock = RING_BUFFER.write();
    data.iter().for_each(|d| {
        lock.push_overwrite(*d);
    });
}

/// From std::print!
///
/// Prints to the console, *without* a newline.
///
/// Similar to its [`println!`] coutnerpart, this macro will also lock the output on each call.
#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => {{
        $crate::logging::print(format_args!($($arg)*));
    }};
}

macro_rules! add_color {
    ($args: ident, $color: ident) => {{
        format_args!("\u{1B}[{}m{}\u{1B}[0m", $color, $args)
    }};
}

pub fn print(args: fmt::Arguments) {
    // Lock and print.
    let _guard = LOG_LOCK.lock();
    if let Some(writer) = *CONSOLE.read() {
        writer(args);
    }
}

pub(crate) fn color_print(args: fmt::Arguments, log_level: Level) {
    let color = log_level_to_color_code(log_level);

    print(add_color!(args, color));
}

fn log_level_to_color_code(level: Level) -> u8 {
    match level {
        Level::Error => 31,
        Level::Warn => 33,
        Level::Info => 37,
        Level::Debug => 32,
        Level::Trace => 36,
    }
}

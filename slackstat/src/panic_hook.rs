use chrono::Local;
use std::{
    backtrace::Backtrace,
    fs::OpenOptions,
    io::Write,
    panic::{PanicHookInfo, take_hook},
    path::{Path, PathBuf},
    thread,
};

use crate::logging::LOG_FILE_PREFIX;

/// Installs a global panic hook that logs panics via `tracing`.
///
/// Release builds abort on panic, so the record is also appended directly to
/// the current daily log file in `log_dir`; the non-blocking writer may not
/// flush before the process exits.
pub fn install(log_dir: impl AsRef<Path>) {
    let log_dir = log_dir.as_ref().to_path_buf();
    let previous_hook = take_hook();

    std::panic::set_hook(Box::new(move |panic_info: &PanicHookInfo<'_>| {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let panic_record = format_panic_record(panic_info);

            tracing::error!(target: "slackstat::panic", "{panic_record}");

            if cfg!(panic = "abort") {
                let _ = append_panic_record(&log_dir, &panic_record);
            }
        }));

        previous_hook(panic_info);
    }));
}

fn append_panic_record(log_dir: &Path, record: &str) -> std::io::Result<()> {
    let filename = format!("{LOG_FILE_PREFIX}.{}", Local::now().format("%Y-%m-%d"));
    let path = PathBuf::from(log_dir).join(filename);

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{record}")?;
    file.flush()
}

fn format_panic_record(panic_info: &PanicHookInfo<'_>) -> String {
    let location = panic_info
        .location()
        .map(|loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()))
        .unwrap_or_else(|| "<unknown>".to_string());
    let thread = thread::current();
    let thread_name = thread.name().unwrap_or("<unnamed>");

    format!(
        "{ts} PANIC version={version} thread={thread_name} location={location} payload={payload}\nBacktrace:\n{backtrace}",
        ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z"),
        version = env!("CARGO_PKG_VERSION"),
        payload = panic_payload(panic_info),
        backtrace = Backtrace::force_capture(),
    )
}

fn panic_payload(panic_info: &PanicHookInfo<'_>) -> String {
    let payload = panic_info.payload();
    payload
        .downcast_ref::<&'static str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| panic_info.to_string())
}

//! Logger module
//!
//! Server-side log sink for the proxy and its embedding server:
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - Store, unexpected and streaming error logging
//! - File-based logging support
//!
//! Nothing logged here is ever written to an HTTP client.

mod format;
pub mod writer;

pub use format::AccessLogEntry;
pub use writer::Level;

use crate::config::Config;
use std::net::SocketAddr;

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    writer::init(
        Level::parse(&config.logging.level),
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
}

fn enabled(level: Level) -> bool {
    !writer::is_initialized() || level >= writer::get().level()
}

/// Write to info/access log
fn write_info(message: &str) {
    if !enabled(Level::Info) {
        return;
    }
    if writer::is_initialized() {
        writer::get().write_info(message);
    } else {
        println!("{message}");
    }
}

/// Write to error log
fn write_error(level: Level, message: &str) {
    if !enabled(level) {
        return;
    }
    if writer::is_initialized() {
        writer::get().write_error(message);
    } else {
        eprintln!("{message}");
    }
}

/// Write to access log specifically
fn write_access(message: &str) {
    if writer::is_initialized() {
        writer::get().write_access(message);
    } else {
        println!("{message}");
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    write_info("======================================");
    write_info("Blob proxy started successfully");
    write_info(&format!("Listening on: http://{addr}"));
    write_info(&format!("Mounted at: {}", config.server.mount_path));
    write_info(&format!("Storage backend: {:?}", config.storage.kind));
    if let Some(ref container) = config.storage.container_name {
        write_info(&format!("Container: {container}"));
    }
    if !config.proxy.index_document_name.is_empty() {
        write_info(&format!("Index document: {}", config.proxy.index_document_name));
    }
    if !config.proxy.not_found_document_path.is_empty() {
        write_info(&format!(
            "Not-found document: {}",
            config.proxy.not_found_document_path
        ));
    }
    write_info(&format!("Log level: {}", config.logging.level));
    if let Some(workers) = config.server.workers {
        write_info(&format!("Worker threads: {workers}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
    write_info("======================================\n");
}

pub fn log_info(message: &str) {
    write_info(&format!("[INFO] {message}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write_error(
        Level::Error,
        &format!("[ERROR] Failed to serve connection: {err:?}"),
    );
}

pub fn log_error(message: &str) {
    write_error(Level::Error, &format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(Level::Warn, &format!("[WARN] {message}"));
}

/// A classified store failure that was turned into its status code
pub fn log_blob_download_error(key: &str, err: &impl std::fmt::Display) {
    write_error(
        Level::Error,
        &format!("[ERROR] blob download error: key={key}: {err}"),
    );
}

/// A failure that carried no store classification and became a 500
pub fn log_unexpected_error(key: &str, err: &impl std::fmt::Display) {
    write_error(
        Level::Error,
        &format!("[ERROR] unexpected error: key={key}: {err}"),
    );
}

/// A body chunk failed after the response headers were already sent
pub fn log_copy_error(key: &str, sent: u64, err: &impl std::fmt::Display) {
    write_error(
        Level::Error,
        &format!("[ERROR] copy resp error: key={key} after {sent} bytes: {err}"),
    );
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    write_access(&entry.format(format));
}

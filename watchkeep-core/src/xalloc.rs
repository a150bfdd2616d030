//! Allocation helpers that terminate the process instead of returning an error.

use std::fmt::Display;
use tracing::error;

fn program_name() -> String {
    std::env::args()
        .next()
        .and_then(|arg0| {
            std::path::Path::new(&arg0)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "watchkeep".to_string())
}

fn fatal(err: impl Display) -> ! {
    error!("{}: malloc failed -- {}", program_name(), err);
    std::process::exit(1)
}

fn reserved<T>(n: usize) -> Vec<T> {
    let mut buf = Vec::new();
    if let Err(e) = buf.try_reserve_exact(n) {
        fatal(e);
    }
    buf
}

/// Zero-filled buffer of `n` bytes.
pub fn alloc_bytes(n: usize) -> Vec<u8> {
    let mut buf = reserved(n);
    buf.resize(n, 0);
    buf
}

/// `count * size` zeroed bytes; an overflowing product is fatal.
pub fn alloc_zeroed(count: usize, size: usize) -> Vec<u8> {
    match count.checked_mul(size) {
        Some(n) => alloc_bytes(n),
        None => fatal(format!("{count} * {size} bytes overflows")),
    }
}

pub fn dup_str(s: &str) -> String {
    let mut out = String::new();
    if let Err(e) = out.try_reserve_exact(s.len()) {
        fatal(e);
    }
    out.push_str(s);
    out
}

/// Copies at most `n` bytes of `s`, cut back to a char boundary.
pub fn dup_str_n(s: &str, n: usize) -> String {
    let mut end = n.min(s.len());
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    dup_str(&s[..end])
}

/// Grows (zero-filled) or truncates `buf` to `n` bytes.
pub fn resize(mut buf: Vec<u8>, n: usize) -> Vec<u8> {
    if n > buf.len() {
        let extra = n - buf.len();
        if let Err(e) = buf.try_reserve_exact(extra) {
            fatal(e);
        }
    }
    buf.resize(n, 0);
    buf
}

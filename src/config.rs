//! Process-wide configuration read from environment variables.
//!
//! Each variable is read once, the first time the setting is needed. Invalid values are reported
//! on the log channel and replaced by the default.

use std::env::{self, VarError};

use image::imageops::FilterType;
use once_cell::sync::Lazy;

const RESAMPLE_FILTER_VAR: &str = "PIXBRIDGE_RESAMPLE_FILTER";
const SHAREABLE_BUFFERS_VAR: &str = "PIXBRIDGE_SHAREABLE_BUFFERS";

const DEFAULT_FILTER: FilterType = FilterType::Triangle;

/// Row-aligned pixel buffer allocations are attempted unless explicitly disabled.
const DEFAULT_SHAREABLE: bool = true;

static RESAMPLE_FILTER: Lazy<FilterType> = Lazy::new(|| {
    let filter = read_var(RESAMPLE_FILTER_VAR, parse_filter).unwrap_or(DEFAULT_FILTER);
    log::debug!("using resample filter: {:?}", filter);
    filter
});

static SHAREABLE_BUFFERS: Lazy<bool> = Lazy::new(|| {
    let shareable = read_var(SHAREABLE_BUFFERS_VAR, parse_switch).unwrap_or(DEFAULT_SHAREABLE);
    log::debug!("shareable pixel buffers: {}", shareable);
    shareable
});

/// Returns the filter used by the resize routines in [`crate::transform`].
///
/// Configured by `PIXBRIDGE_RESAMPLE_FILTER`: one of `nearest`, `triangle` (the default),
/// `catmull-rom`, `gaussian` or `lanczos3`.
pub fn resample_filter() -> FilterType {
    *RESAMPLE_FILTER
}

/// Returns whether [`PixelBuffer::new`][crate::buffer::PixelBuffer::new] first attempts a
/// row-aligned, GPU-shareable allocation.
///
/// Configured by `PIXBRIDGE_SHAREABLE_BUFFERS`: `on` (the default) or `off`.
pub fn shareable_buffers() -> bool {
    *SHAREABLE_BUFFERS
}

fn read_var<T>(name: &str, parse: fn(&str) -> Option<T>) -> Option<T> {
    match env::var(name) {
        Ok(v) => {
            let parsed = parse(&v);
            if parsed.is_none() {
                log::warn!("invalid value set for `{name}` variable: '{v}'; using default");
            }
            parsed
        }
        Err(VarError::NotPresent) => None,
        Err(VarError::NotUnicode(s)) => {
            log::warn!(
                "invalid value set for `{name}` variable: {}; using default",
                s.to_string_lossy()
            );
            None
        }
    }
}

fn parse_filter(v: &str) -> Option<FilterType> {
    Some(match v {
        "nearest" => FilterType::Nearest,
        "triangle" => FilterType::Triangle,
        "catmull-rom" => FilterType::CatmullRom,
        "gaussian" => FilterType::Gaussian,
        "lanczos3" => FilterType::Lanczos3,
        _ => return None,
    })
}

fn parse_switch(v: &str) -> Option<bool> {
    match v {
        "1" | "true" | "on" => Some(true),
        "0" | "false" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters() {
        assert_eq!(parse_filter("nearest"), Some(FilterType::Nearest));
        assert_eq!(parse_filter("lanczos3"), Some(FilterType::Lanczos3));
        assert_eq!(parse_filter("bicubic"), None);
    }

    #[test]
    fn switches() {
        assert_eq!(parse_switch("on"), Some(true));
        assert_eq!(parse_switch("0"), Some(false));
        assert_eq!(parse_switch("yes"), None);
    }
}

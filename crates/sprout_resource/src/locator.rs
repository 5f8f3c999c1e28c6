//! Address resolution.
//!
//! Turns an opaque address such as `gs://bucket/config.json` or `./settings.toml`
//! into a [`Locator`]: a scheme tag plus the remainder of the address.
//!
//! # Grammar
//!
//! ```text
//! address = [scheme ":" ["/"...]] path
//! scheme  = ALPHA *( ALPHA / DIGIT / "+" / "-" )
//! ```
//!
//! Addresses starting with `.` or a path separator are local files and keep the
//! address untouched. Addresses with no recognizable scheme are schemeless
//! (empty scheme tag).
//!
//! ```
//! use sprout_resource::locator::resolve;
//!
//! let locator = resolve("gs://bucket/obj").unwrap();
//! assert_eq!(locator.scheme(), "gs");
//! assert_eq!(locator.remainder(), "bucket/obj");
//!
//! let locator = resolve("./var/log").unwrap();
//! assert_eq!(locator.scheme(), "file");
//! assert_eq!(locator.remainder(), "./var/log");
//! ```

use crate::error::LocatorError;
use core::fmt;

/// Scheme tag for local files.
pub const FILE_SCHEME: &str = "file";

/// Scheme tag for Google Cloud Storage objects.
pub const GCS_SCHEME: &str = "gs";

/// A resolved address: scheme tag and remainder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    scheme: String,
    remainder: String,
}

impl Locator {
    /// Creates a locator from its parts.
    #[must_use]
    pub fn new(scheme: impl Into<String>, remainder: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            remainder: remainder.into(),
        }
    }

    /// The scheme tag, empty for schemeless addresses.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Everything after the scheme.
    #[must_use]
    pub fn remainder(&self) -> &str {
        &self.remainder
    }

    /// Returns `true` if no scheme was recognized.
    #[must_use]
    pub fn is_schemeless(&self) -> bool {
        self.scheme.is_empty()
    }

    /// Splits the locator into `(scheme, remainder)`.
    #[must_use]
    pub fn into_parts(self) -> (String, String) {
        (self.scheme, self.remainder)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scheme.is_empty() {
            f.write_str(&self.remainder)
        } else {
            write!(f, "{}://{}", self.scheme, self.remainder)
        }
    }
}

/// Resolves an address into a [`Locator`].
///
/// # Errors
///
/// - [`LocatorError::Empty`] if `address` is empty
/// - [`LocatorError::MissingScheme`] if `address` starts with `:`
/// - [`LocatorError::MissingPath`] if nothing follows the scheme
pub fn resolve(address: &str) -> Result<Locator, LocatorError> {
    if address.is_empty() {
        return Err(LocatorError::Empty);
    }

    let locator = scan(address)?;
    if locator.remainder.is_empty() {
        return Err(LocatorError::MissingPath(address.to_string()));
    }

    Ok(locator)
}

fn scan(address: &str) -> Result<Locator, LocatorError> {
    for (i, c) in address.char_indices() {
        match c {
            c if c.is_ascii_alphabetic() => {}
            c if c.is_ascii_digit() || c == '+' || c == '-' => {
                if i == 0 {
                    return Ok(Locator::new("", strip_leading_slashes(address)));
                }
            }
            ':' => {
                if i == 0 {
                    return Err(LocatorError::MissingScheme(address.to_string()));
                }
                return Ok(Locator::new(
                    &address[..i],
                    strip_leading_slashes(&address[i + 1..]),
                ));
            }
            c if c == '.' || std::path::is_separator(c) => {
                return Ok(Locator::new(FILE_SCHEME, address));
            }
            // Anything else rules out a scheme.
            _ => return Ok(Locator::new("", address)),
        }
    }

    Ok(Locator::new("", strip_leading_slashes(address)))
}

fn strip_leading_slashes(s: &str) -> &str {
    s.trim_start_matches('/')
}

//! Session options and the settings derived from them

use std::collections::BTreeMap;

use satchel_core::{Error, Result};

use crate::host::CookieParams;

const OPTION_PREFIX: &str = "session.";

pub const DEFAULT_GC_PROBABILITY: u32 = 1;
pub const DEFAULT_GC_DIVISOR: u32 = 100;
pub const DEFAULT_GC_MAXLIFETIME: u64 = 1440;

/// Option names understood by the session manager
pub const RECOGNIZED_OPTIONS: &[&str] = &[
    "save_path",
    "gc_probability",
    "gc_divisor",
    "gc_maxlifetime",
    "use_cookies",
    "cookie_lifetime",
    "cookie_path",
    "cookie_domain",
    "cookie_secure",
    "cookie_httponly",
    "auto_start",
];

/// Raw session options, name -> value
///
/// Names may carry a `session.` prefix, which is stripped on insert.
/// Unrecognized names are kept and passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOptions {
    values: BTreeMap<String, String>,
}

impl SessionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
        self.values
            .insert(normalize_key(key.as_ref()).to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(normalize_key(key)).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Whether `set` may start the session implicitly
    pub fn auto_start(&self) -> Result<bool> {
        self.get("auto_start")
            .map(|v| parse_flag("auto_start", v))
            .unwrap_or(Ok(true))
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for SessionOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut options = Self::new();
        for (key, value) in iter {
            options.insert(key, value);
        }
        options
    }
}

/// Parsed, typed view of the recognized options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub save_path: String,
    pub gc_probability: u32,
    pub gc_divisor: u32,
    pub gc_maxlifetime: u64,
    pub use_cookies: bool,
    pub auto_start: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            save_path: String::new(),
            gc_probability: DEFAULT_GC_PROBABILITY,
            gc_divisor: DEFAULT_GC_DIVISOR,
            gc_maxlifetime: DEFAULT_GC_MAXLIFETIME,
            use_cookies: true,
            auto_start: true,
        }
    }
}

impl SessionSettings {
    /// Parse the recognized options, applying cookie options onto `cookie`
    ///
    /// # Errors
    /// `Error::Config` naming the first option whose value cannot be parsed
    pub fn from_options(options: &SessionOptions, cookie: &mut CookieParams) -> Result<Self> {
        let mut settings = Self::default();

        for (key, value) in options.iter() {
            match key {
                "save_path" => settings.save_path = value.to_string(),
                "gc_probability" => settings.gc_probability = parse_number(key, value)?,
                "gc_divisor" => settings.gc_divisor = parse_number(key, value)?,
                "gc_maxlifetime" => settings.gc_maxlifetime = parse_number(key, value)?,
                "use_cookies" => settings.use_cookies = parse_flag(key, value)?,
                "auto_start" => settings.auto_start = parse_flag(key, value)?,
                "cookie_lifetime" => cookie.lifetime = parse_number(key, value)?,
                "cookie_path" => cookie.path = value.to_string(),
                "cookie_domain" => cookie.domain = value.to_string(),
                "cookie_secure" => cookie.secure = parse_flag(key, value)?,
                "cookie_httponly" => cookie.http_only = parse_flag(key, value)?,
                _ => {}
            }
        }

        Ok(settings)
    }

    /// Whether a gc pass should run, given a roll in `0..gc_divisor`
    pub fn gc_due(&self, roll: u32) -> bool {
        self.gc_divisor > 0 && roll < self.gc_probability
    }

    /// Effective settings as option name -> value, merged with pass-through options
    pub fn to_map(&self, options: &SessionOptions, cookie: &CookieParams) -> BTreeMap<String, String> {
        let mut map: BTreeMap<String, String> = options
            .iter()
            .filter(|(k, _)| !RECOGNIZED_OPTIONS.contains(k))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let flag = |b: bool| String::from(if b { "1" } else { "0" });

        map.insert("save_path".into(), self.save_path.clone());
        map.insert("gc_probability".into(), self.gc_probability.to_string());
        map.insert("gc_divisor".into(), self.gc_divisor.to_string());
        map.insert("gc_maxlifetime".into(), self.gc_maxlifetime.to_string());
        map.insert("use_cookies".into(), flag(self.use_cookies));
        map.insert("auto_start".into(), flag(self.auto_start));
        map.insert("cookie_lifetime".into(), cookie.lifetime.to_string());
        map.insert("cookie_path".into(), cookie.path.clone());
        map.insert("cookie_domain".into(), cookie.domain.clone());
        map.insert("cookie_secure".into(), flag(cookie.secure));
        map.insert("cookie_httponly".into(), flag(cookie.http_only));
        map
    }
}

fn normalize_key(key: &str) -> &str {
    key.strip_prefix(OPTION_PREFIX).unwrap_or(key)
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("option {} expects a number, got {:?}", key, value)))
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" | "" => Ok(false),
        _ => Err(Error::Config(format!(
            "option {} expects a boolean, got {:?}",
            key, value
        ))),
    }
}

use anyhow::{Result, anyhow};
use std::{fmt::Display, str::FromStr};

/// Source of configuration values. The process environment in production,
/// a plain map in tests.
pub trait Lookup {
    fn get(&self, key: &str) -> Option<String>;
}

impl<F> Lookup for F
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        self(key)
    }
}

pub fn must(env: &impl Lookup, key: &str) -> Result<String> {
    opt(env, key).ok_or_else(|| anyhow!("missing required env: {key}"))
}

pub fn opt(env: &impl Lookup, key: &str) -> Option<String> {
    env.get(key).filter(|v| !v.is_empty())
}

pub fn parse<T: FromStr>(env: &impl Lookup, key: &str, default: T) -> Result<T>
where
    <T as FromStr>::Err: Display,
{
    match opt(env, key) {
        Some(s) => s.parse::<T>().map_err(|e| anyhow!("failed to parse {key}='{s}': {e}")),
        None => Ok(default),
    }
}

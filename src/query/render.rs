//! Template rendering for executable files.
//!
//! Only `{{ name }}` placeholders are understood. Whitespace inside the
//! braces is ignored, bound names are substituted and anything unknown is
//! left in place so the warehouse reports it.

use std::{collections::HashMap, sync::LazyLock};

use chrono::{Local, NaiveDate};
use regex::{Captures, Regex};

/// Matches `{{ identifier }}` with optional inner whitespace.
static PLACEHOLDER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("valid regex")
});

#[derive(Debug, Clone, Default)]
pub struct Renderer {
    variables: HashMap<String, String>
}

impl Renderer {
    pub fn new(variables: HashMap<String, String>) -> Self {
        Self {
            variables
        }
    }

    /// Renderer with `ds` / `ds_nodash` bound to today's date, overridden by
    /// any explicitly configured variable.
    pub fn with_builtin_variables(variables: HashMap<String, String>) -> Self {
        let mut all = builtin_variables(Local::now().date_naive());
        all.extend(variables);
        Self::new(all)
    }

    pub fn render(&self, text: &str) -> String {
        PLACEHOLDER_REGEX
            .replace_all(text, |caps: &Captures| match self.variables.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string()
            })
            .into_owned()
    }
}

fn builtin_variables(date: NaiveDate) -> HashMap<String, String> {
    HashMap::from([
        ("ds".to_string(), date.format("%Y-%m-%d").to_string()),
        ("ds_nodash".to_string(), date.format("%Y%m%d").to_string())
    ])
}

//! Comma-separated glob filters.
//!
//! A filter is a list of glob items such as `"*,-experimental-*"`: `*`
//! matches any run of characters, a leading `-` negates the item, and the
//! last matching item wins. This is the format of the `analyses` and
//! `checkers` options.

use std::cell::RefCell;
use std::collections::HashMap;

use regex::Regex;

struct Glob {
    is_negative: bool,
    regex: Regex,
}

fn regex_for(glob: &str) -> Regex {
    let mut pattern = String::from("^");
    for c in glob.chars() {
        if c == '*' {
            pattern.push_str(".*");
        } else if c.is_ascii_punctuation() {
            pattern.push('\\');
            pattern.push(c);
        } else {
            pattern.push(c);
        }
    }
    pattern.push('$');
    Regex::new(&pattern).expect("escaped glob is always a valid regex")
}

/// A compiled glob filter with a per-string memo cache.
pub struct Globs {
    globs: Vec<Glob>,
    cache: RefCell<HashMap<String, bool>>,
}

impl Globs {
    #[must_use]
    pub fn new(spec: &str) -> Self {
        let mut globs = Vec::new();
        for item in spec.split(',') {
            let item = item.trim();
            let (is_negative, item) = match item.strip_prefix('-') {
                Some(rest) => (true, rest.trim()),
                None => (false, item),
            };
            if item.is_empty() {
                continue;
            }
            globs.push(Glob {
                is_negative,
                regex: regex_for(item),
            });
        }
        Self {
            globs,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Does `s` pass the filter? Items are consulted last-to-first so a
    /// later item overrides an earlier one.
    #[must_use]
    pub fn matches(&self, s: &str) -> bool {
        if let Some(&hit) = self.cache.borrow().get(s) {
            return hit;
        }
        let mut res = false;
        for glob in self.globs.iter().rev() {
            if glob.regex.is_match(s) {
                res = !glob.is_negative;
                break;
            }
        }
        self.cache.borrow_mut().insert(s.to_owned(), res);
        res
    }
}

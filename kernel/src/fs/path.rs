//! Path tokenizer.
//!
//! A path is a `/`-separated list of names. The separator never becomes part of a name and empty components
//! (leading, doubled or trailing slashes) are skipped, so `/dev//tty/` and `dev/tty` are the same path.
//!
//! A backslash escapes the following character, which is then taken literally: `\/` puts a slash into a
//! name and `\\` a backslash. A backslash at the very end of the input has nothing to escape and is rejected.

use alloc::{string::String, vec::Vec};
use core::fmt;

use crate::{
    error::{Errno, KResult},
    fs::MAX_NAME_LEN,
};

const SEPARATOR: char = '/';
const ESCAPE: char = '\\';

/// One name of a [`Path`]. Never empty and never longer than [`MAX_NAME_LEN`] bytes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PathComponent {
    name: String,
}

impl PathComponent {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl AsRef<str> for PathComponent {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

/// A tokenized path. The components are owned as a unit: dropping the path releases all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path {
    components: Vec<PathComponent>,
}

impl Path {
    /// Tokenizes `path`.
    ///
    /// Fails with `EINVAL` if the path is empty, contains a NUL character, ends with a dangling escape or has a
    /// component longer than [`MAX_NAME_LEN`]. Whatever was parsed before the failure is released.
    pub fn parse(path: &str) -> KResult<Self> {
        if path.is_empty() {
            return Err(Errno::EINVAL);
        }

        let mut components = Vec::new();
        let mut current = String::new();
        let mut escaped = false;

        for c in path.chars() {
            if c == '\0' {
                return Err(Errno::EINVAL);
            }

            if escaped {
                push_char(&mut current, c)?;
                escaped = false;
                continue;
            }

            match c {
                ESCAPE => escaped = true,
                SEPARATOR => finish_component(&mut components, &mut current)?,
                _ => push_char(&mut current, c)?,
            }
        }

        if escaped {
            return Err(Errno::EINVAL);
        }
        finish_component(&mut components, &mut current)?;

        Ok(Self { components })
    }

    pub fn components(&self) -> &[PathComponent] {
        &self.components
    }

    pub fn iter(&self) -> core::slice::Iter<'_, PathComponent> {
        self.components.iter()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// An empty path names the root directory.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Returns the last component and the components leading to it.
    pub fn split_last(&self) -> Option<(&PathComponent, &[PathComponent])> {
        self.components.split_last()
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a PathComponent;
    type IntoIter = core::slice::Iter<'a, PathComponent>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Renders the path absolute, escaping separators and backslashes inside names.
impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return f.write_str("/");
        }

        for component in self.components.iter() {
            f.write_str("/")?;
            for c in component.name.chars() {
                if c == SEPARATOR || c == ESCAPE {
                    write!(f, "{}", ESCAPE)?;
                }
                write!(f, "{}", c)?;
            }
        }

        Ok(())
    }
}

fn push_char(name: &mut String, c: char) -> KResult<()> {
    if name.len() + c.len_utf8() > MAX_NAME_LEN {
        return Err(Errno::EINVAL);
    }

    name.try_reserve(c.len_utf8()).map_err(|_| Errno::ENOMEM)?;
    name.push(c);
    Ok(())
}

fn finish_component(components: &mut Vec<PathComponent>, current: &mut String) -> KResult<()> {
    if current.is_empty() {
        return Ok(());
    }

    components.try_reserve(1).map_err(|_| Errno::ENOMEM)?;
    components.push(PathComponent {
        name: core::mem::take(current),
    });
    Ok(())
}

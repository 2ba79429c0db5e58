use std::collections::BTreeSet;
use std::fmt;

/// Cursor of the next unit of work.
///
/// Field order gives the derived `Ord` its lexicographic `(page, row)` meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Checkpoint {
    pub page: u32,
    pub next_row_index: usize,
}

impl Checkpoint {
    pub fn new(page: u32, next_row_index: usize) -> Self {
        Self {
            page: page.max(1),
            next_row_index,
        }
    }

    /// The row at `next_row_index` is done; point at the one after it.
    pub fn advance_row(self) -> Self {
        Self {
            page: self.page,
            next_row_index: self.next_row_index + 1,
        }
    }

    /// First row of the following page.
    pub fn next_page(self) -> Self {
        Self {
            page: self.page + 1,
            next_row_index: 0,
        }
    }
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self {
            page: 1,
            next_row_index: 0,
        }
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {} row {}", self.page, self.next_row_index)
    }
}

/// Category codes already present in the output store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessedSet {
    codes: BTreeSet<String>,
}

impl ProcessedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `code`; blank codes are never tracked.
    pub fn insert(&mut self, code: &str) -> bool {
        let code = code.trim();
        if code.is_empty() {
            return false;
        }
        self.codes.insert(code.to_string())
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains(code.trim())
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.codes.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for ProcessedSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = ProcessedSet::new();
        for code in iter {
            set.insert(code.as_ref());
        }
        set
    }
}

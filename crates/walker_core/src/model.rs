use std::fmt;

/// One row of the top-level category table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Category {
    pub code: String,
    pub description: String,
}

impl Category {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.code, self.description)
    }
}

/// One row of a category's detail sub-table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailItem {
    pub code: String,
    pub description: String,
}

impl DetailItem {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRow {
    pub category_code: String,
    pub category_description: String,
    pub detail_code: String,
    pub detail_description: String,
}

impl OutputRow {
    pub const HEADER: [&'static str; 4] = [
        "category_code",
        "category_description",
        "detail_code",
        "detail_description",
    ];

    /// Rows recorded for one visited category. A category without detail
    /// items still yields a single row with empty detail fields.
    pub fn for_category(category: &Category, items: &[DetailItem]) -> Vec<OutputRow> {
        if items.is_empty() {
            return vec![OutputRow {
                category_code: category.code.clone(),
                category_description: category.description.clone(),
                detail_code: String::new(),
                detail_description: String::new(),
            }];
        }
        items
            .iter()
            .map(|item| OutputRow {
                category_code: category.code.clone(),
                category_description: category.description.clone(),
                detail_code: item.code.clone(),
                detail_description: item.description.clone(),
            })
            .collect()
    }

    pub fn fields(&self) -> [&str; 4] {
        [
            self.category_code.as_str(),
            self.category_description.as_str(),
            self.detail_code.as_str(),
            self.detail_description.as_str(),
        ]
    }
}

/// Content fingerprint of the first visible row of a table.
///
/// Element identity is unstable across redraws, so page transitions are
/// detected by comparing what the first row says rather than which node it is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RowSignature(String);

impl RowSignature {
    pub fn from_first_row(code: &str, description: &str) -> Self {
        Self(format!("{}|{}", code.trim(), description.trim()))
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableSnapshot {
    pub signature: RowSignature,
    pub row_count: usize,
}

impl TableSnapshot {
    /// An unchanged signature together with an unchanged row count means no
    /// transition happened.
    pub fn changed_from(&self, before: &TableSnapshot) -> bool {
        self.row_count != before.row_count || self.signature != before.signature
    }
}

/// Classification of one list row as read from the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowRead {
    /// Fewer cells than the table contract requires.
    Incomplete { columns: usize },
    /// Placeholder row: code and description are both empty.
    Blank,
    Category(Category),
}

impl RowRead {
    pub fn classify<S: AsRef<str>>(cells: &[S], min_columns: usize) -> RowRead {
        if cells.len() < min_columns {
            return RowRead::Incomplete {
                columns: cells.len(),
            };
        }
        let cell = |i: usize| {
            cells
                .get(i)
                .map(|c| c.as_ref().trim().to_string())
                .unwrap_or_default()
        };
        let code = cell(0);
        let description = cell(1);
        if code.is_empty() && description.is_empty() {
            return RowRead::Blank;
        }
        RowRead::Category(Category { code, description })
    }
}

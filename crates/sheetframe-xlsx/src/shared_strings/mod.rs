mod parse;

pub use parse::parse_shared_strings_xml;
pub use parse::SharedStringsError;

/// Shared strings table (`xl/sharedStrings.xml`), index -> plain text.
///
/// Built once per workbook and never mutated afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SharedStrings {
    items: Vec<String>,
}

impl SharedStrings {
    pub fn new(items: Vec<String>) -> Self {
        Self { items }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.items.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }
}

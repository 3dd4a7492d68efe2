/// Extracted text of one uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBlock {
    pub name: String,
    pub text: String,
}

impl FileBlock {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        FileBlock { name: name.into(), text: text.into() }
    }

    pub fn render(&self) -> String {
        format!("--- FILE: {} ---\n{}\n", self.name, self.text)
    }
}

/// Document text of the latest upload batch, prefixed to prompts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileContext {
    text: String,
    files: Vec<String>,
}

impl FileContext {
    pub fn from_blocks(blocks: &[FileBlock]) -> Self {
        FileContext {
            text: blocks
                .iter()
                .map(FileBlock::render)
                .collect::<Vec<_>>()
                .join("\n"),
            files: blocks.iter().map(|b| b.name.clone()).collect(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

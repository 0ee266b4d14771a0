use anyhow::{Result, anyhow};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, Lines};

/// Line-based terminal prompt.
///
/// Generic over the reader so the interactive flow can be driven from a byte
/// buffer in tests.
pub struct Prompt<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin> Prompt<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }

    /// Prints `label` and reads one line. Surrounding whitespace is kept,
    /// passwords may legitimately contain it.
    pub async fn ask(&mut self, label: &str) -> Result<String> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(label.as_bytes()).await?;
        stdout.flush().await?;
        self.lines
            .next_line()
            .await?
            .ok_or_else(|| anyhow!("input closed"))
    }

    /// An empty answer is treated as "not given".
    pub async fn ask_optional(&mut self, label: &str) -> Result<Option<String>> {
        let answer = self.ask(label).await?;
        Ok(if answer.trim().is_empty() {
            None
        } else {
            Some(answer)
        })
    }
}

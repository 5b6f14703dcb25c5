use rustyline::{Config, Editor, Result};

use crate::backend::Backend;

pub fn generate_prompt(backend: Backend) -> String {
    format!("[{}] > ", backend)
}

pub fn rl() -> Result<Editor<()>> {
    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(false)
        .build();
    Editor::with_config(config)
}

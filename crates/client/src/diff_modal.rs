//! Console `DiffModal`: the minimal human-in-the-loop surface for startup
//! conflicts when no richer UI is wired up. Prints both sides and reads one
//! line from stdin.

use async_trait::async_trait;

use synctree_reconciler::{ConflictChoice, DiffModal, Result};

pub struct ConsoleDiffModal;

#[async_trait]
impl DiffModal for ConsoleDiffModal {
    async fn resolve(&self, local: &str, remote: &str) -> Result<ConflictChoice> {
        println!("--- local ---\n{local}\n--- remote ---\n{remote}\n");
        println!("keep (l)ocal, (r)emote, or paste a replacement ending with a lone '.' line to (m)erge? [r]");

        let choice = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).ok();
            line.trim().to_lowercase()
        })
        .await
        .unwrap_or_default();

        match choice.as_str() {
            "l" | "local" => Ok(ConflictChoice::KeepLocal),
            "m" | "merge" => {
                let merged = tokio::task::spawn_blocking(read_merged_text).await.unwrap_or_default();
                Ok(ConflictChoice::Merged(merged))
            }
            _ => Ok(ConflictChoice::KeepRemote),
        }
    }
}

/// Reads the operator's hand-merged replacement body, one line at a time
/// until a line containing only `.`, mirroring the terminator classic
/// line-mode mail composers use for a multi-line body.
fn read_merged_text() -> String {
    let mut merged = String::new();
    let mut line = String::new();
    loop {
        line.clear();
        if std::io::stdin().read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        if line.trim_end_matches(['\n', '\r']) == "." {
            break;
        }
        merged.push_str(&line);
    }
    merged
}

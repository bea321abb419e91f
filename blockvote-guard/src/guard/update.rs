use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::lists::ModerationLists;
use super::moderation::Moderator;

/// Reloads the moderation lists file when its mtime changes.
pub struct ListUpdater {
    moderator: Moderator,
    lists_path: PathBuf,
    interval: Duration,
}

pub struct ListUpdaterHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ListUpdater {
    pub fn new(moderator: Moderator, lists_path: PathBuf, interval: Duration) -> Self {
        Self {
            moderator,
            lists_path,
            interval,
        }
    }

    pub fn start(self) -> ListUpdaterHandle {
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(self.run(rx));
        ListUpdaterHandle { shutdown: tx, task }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut last_mtime: Option<SystemTime> = None;
        let mut ticker = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    tracing::info!("moderation list updater shutdown");
                    return;
                }
                _ = ticker.tick() => {
                    let meta = match tokio::fs::metadata(&self.lists_path).await {
                        Ok(m) => m,
                        Err(e) => {
                            tracing::warn!("moderation lists metadata error: {}", e);
                            continue;
                        }
                    };
                    let mtime = match meta.modified() {
                        Ok(t) => t,
                        Err(_) => continue,
                    };
                    if last_mtime.map(|x| x >= mtime).unwrap_or(false) {
                        continue;
                    }
                    last_mtime = Some(mtime);

                    match ModerationLists::load_from_file(&self.lists_path).and_then(|l| l.compile()) {
                        Ok(compiled) => {
                            tracing::info!(
                                version = ?compiled.version,
                                keywords = compiled.keyword_count(),
                                patterns = compiled.pattern_count(),
                                "moderation lists reloaded"
                            );
                            self.moderator.swap_lists(compiled);
                        }
                        Err(e) => {
                            tracing::error!("moderation lists reload failed (keep old): {:#}", e);
                        }
                    }
                }
            }
        }
    }
}

impl ListUpdaterHandle {
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!("moderation list updater join error: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn picks_up_lists_file_and_keeps_old_on_error() {
        let path = std::env::temp_dir().join(format!("blockvote-lists-{}.yaml", std::process::id()));
        std::fs::write(&path, "keywords:\n  - category: spam\n    words: [lambo]\n").unwrap();

        let moderator = Moderator::default();
        let handle = ListUpdater::new(moderator.clone(), path.clone(), Duration::from_millis(10)).start();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let r = moderator.moderate_content("Wen lambo?");
        assert_eq!(r.flagged_words, Some(vec!["lambo".to_string()]));

        // a broken file leaves the loaded lists in place
        tokio::time::sleep(Duration::from_millis(20)).await;
        std::fs::write(&path, "patterns:\n  - category: x\n    pattern: '(oops'\n").unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!moderator.moderate_content("Wen lambo?").is_allowed);

        handle.stop().await;
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn mistyped_lists_file_keeps_moderation_on() {
        let path = std::env::temp_dir().join(format!("blockvote-lists-typo-{}.yaml", std::process::id()));
        std::fs::write(&path, "keywords:\n  - category: spam\n    words: [lambo]\n").unwrap();

        let moderator = Moderator::default();
        let handle = ListUpdater::new(moderator.clone(), path.clone(), Duration::from_millis(10)).start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!moderator.moderate_content("Wen lambo?").is_allowed);

        // `keyword:` is not a field; the file must not load as empty lists
        tokio::time::sleep(Duration::from_millis(20)).await;
        std::fs::write(&path, "keyword:\n  - category: spam\n    words: [lambo, moon]\n").unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        let r = moderator.moderate_content("Wen lambo?");
        assert_eq!(r.flagged_words, Some(vec!["lambo".to_string()]));
        assert_eq!(moderator.lists_snapshot().keyword_count(), 1);

        handle.stop().await;
        let _ = std::fs::remove_file(&path);
    }
}

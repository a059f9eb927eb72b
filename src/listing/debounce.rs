//! Trailing-edge debouncer
//!
//! Values pushed in quick succession collapse into one commit of the latest
//! value once input has been quiet for the configured delay.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub struct Debouncer<T> {
    tx: mpsc::UnboundedSender<T>,
    task: JoinHandle<()>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Spawn the debounce task; `commit` receives each settled value
    pub fn spawn<F>(delay: Duration, commit: F) -> Self
    where
        F: Fn(T) + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<T>();
        let task = tokio::spawn(async move {
            while let Some(mut pending) = rx.recv().await {
                loop {
                    tokio::select! {
                        next = rx.recv() => match next {
                            Some(value) => pending = value,
                            None => break,
                        },
                        _ = tokio::time::sleep(delay) => break,
                    }
                }
                commit(pending);
            }
        });
        Self { tx, task }
    }

    /// Queue a value, restarting the quiet period
    pub fn push(&self, value: T) {
        if self.tx.send(value).is_err() {
            tracing::warn!("Debounce task is gone; dropping value");
        }
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(String) + Send + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |v| sink.lock().unwrap().push(v))
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_input_commits_last_value_once() {
        let (seen, commit) = recorder();
        let debouncer = Debouncer::spawn(Duration::from_millis(300), commit);

        for text in ["g", "ga", "gal", "gala"] {
            debouncer.push(text.to_string());
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(seen.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(*seen.lock().unwrap(), vec!["gala".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_commit_separately() {
        let (seen, commit) = recorder();
        let debouncer = Debouncer::spawn(Duration::from_millis(300), commit);

        debouncer.push("a".to_string());
        tokio::time::sleep(Duration::from_millis(400)).await;
        debouncer.push("b".to_string());
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(*seen.lock().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_commit() {
        let (seen, commit) = recorder();
        let debouncer = Debouncer::spawn(Duration::from_millis(300), commit);

        debouncer.push("gone".to_string());
        drop(debouncer);
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert!(seen.lock().unwrap().is_empty());
    }
}

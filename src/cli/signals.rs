//! Stop requests from the terminal

use tokio::sync::mpsc;
use tracing::debug;

/// Why the user asked to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopRequest {
    /// Enter pressed
    Enter,
    /// SIGINT / Ctrl+C
    Interrupt,
}

/// Listens for Ctrl+C and for a line on stdin
pub struct StopSignal {
    receiver: mpsc::Receiver<StopRequest>,
}

impl StopSignal {
    /// Start listening. Stdin is read on a detached thread so a pending
    /// read never holds up runtime shutdown; a closed stdin is ignored.
    pub fn listen() -> Self {
        let (tx, rx) = mpsc::channel(4);

        let tx_int = tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = tx_int.send(StopRequest::Interrupt).await;
            }
        });

        let spawned = std::thread::Builder::new()
            .name("stdin-stop".to_string())
            .spawn(move || {
                let mut line = String::new();
                match std::io::stdin().read_line(&mut line) {
                    Ok(0) => debug!("stdin closed, waiting for Ctrl+C"),
                    Ok(_) => {
                        let _ = tx.blocking_send(StopRequest::Enter);
                    }
                    Err(e) => debug!(error = %e, "stdin unavailable"),
                }
            });
        if let Err(e) = spawned {
            debug!(error = %e, "stdin listener not started");
        }

        Self { receiver: rx }
    }

    /// Wait for the next request
    pub async fn recv(&mut self) -> Option<StopRequest> {
        self.receiver.recv().await
    }
}

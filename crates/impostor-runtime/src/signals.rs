use anyhow::Result;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

// SIGKILL, SIGSTOP, SIGCHLD and the synchronous faults stay with this process.
#[cfg(unix)]
const RELAYED_SIGNALS: [nix::sys::signal::Signal; 17] = {
    use nix::sys::signal::Signal;
    [
        Signal::SIGHUP,
        Signal::SIGINT,
        Signal::SIGQUIT,
        Signal::SIGUSR1,
        Signal::SIGUSR2,
        Signal::SIGPIPE,
        Signal::SIGALRM,
        Signal::SIGTERM,
        Signal::SIGCONT,
        Signal::SIGTSTP,
        Signal::SIGTTIN,
        Signal::SIGTTOU,
        Signal::SIGURG,
        Signal::SIGXCPU,
        Signal::SIGXFSZ,
        Signal::SIGVTALRM,
        Signal::SIGWINCH,
    ]
};

pub(crate) struct SignalRelay {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl SignalRelay {
    pub(crate) fn start(child: Option<u32>) -> Result<Self> {
        let (sender, received) = mpsc::unbounded_channel();
        let listeners = listen(sender)?;
        let (stop, stop_received) = oneshot::channel();
        let handle = tokio::spawn(relay(child, received, stop_received, listeners));
        Ok(Self { stop, handle })
    }

    pub(crate) async fn stop(self) {
        // The relay may already be gone if every listener closed.
        let _ = self.stop.send(());
        if let Err(err) = self.handle.await {
            tracing::warn!(error = %err, "signal relay ended abnormally");
        }
    }
}

async fn relay(
    child: Option<u32>,
    mut received: mpsc::UnboundedReceiver<i32>,
    mut stop: oneshot::Receiver<()>,
    listeners: Vec<JoinHandle<()>>,
) {
    loop {
        tokio::select! {
            biased;
            _ = &mut stop => break,
            signal = received.recv() => match signal {
                Some(signal) => forward(child, signal),
                None => break,
            },
        }
    }

    for listener in listeners {
        listener.abort();
    }
    tracing::debug!("signal relay stopped");
}

#[cfg(unix)]
fn listen(sender: mpsc::UnboundedSender<i32>) -> Result<Vec<JoinHandle<()>>> {
    use anyhow::Context;
    use tokio::signal::unix::{signal, SignalKind};

    let mut streams = Vec::with_capacity(RELAYED_SIGNALS.len());
    for relayed in RELAYED_SIGNALS {
        let raw = relayed as i32;
        let stream = signal(SignalKind::from_raw(raw))
            .with_context(|| format!("failed to listen for {relayed}"))?;
        streams.push((raw, stream));
    }

    Ok(streams
        .into_iter()
        .map(|(raw, mut stream)| {
            let sender = sender.clone();
            tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    if sender.send(raw).is_err() {
                        break;
                    }
                }
            })
        })
        .collect())
}

#[cfg(not(unix))]
fn listen(_sender: mpsc::UnboundedSender<i32>) -> Result<Vec<JoinHandle<()>>> {
    Ok(Vec::new())
}

#[cfg(unix)]
fn forward(child: Option<u32>, raw: i32) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child else {
        tracing::debug!(signal = raw, "child already reaped, dropping signal");
        return;
    };
    #[allow(clippy::cast_possible_wrap)]
    let target = Pid::from_raw(pid as i32);
    match Signal::try_from(raw).and_then(|signal| kill(target, signal)) {
        Ok(()) => tracing::debug!(signal = raw, pid, "relayed signal"),
        Err(errno) => tracing::warn!(signal = raw, pid, error = %errno, "failed to relay signal"),
    }
}

#[cfg(not(unix))]
fn forward(_child: Option<u32>, _raw: i32) {}

//! OS signal kinds and the registered signal source.
//!
//! Registration happens when [`SignalListener::register`] is called, not when
//! it is first polled. A signal delivered in between is buffered by tokio and
//! observed by the next [`SignalListener::recv`].

use std::future::poll_fn;
use std::task::Poll;

use crate::{DeathError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sig {
    Interrupt,
    Terminate,
    Hangup,
    Quit,
    User1,
    User2,
}

impl Sig {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interrupt => "SIGINT",
            Self::Terminate => "SIGTERM",
            Self::Hangup => "SIGHUP",
            Self::Quit => "SIGQUIT",
            Self::User1 => "SIGUSR1",
            Self::User2 => "SIGUSR2",
        }
    }

    #[cfg(unix)]
    fn kind(&self) -> tokio::signal::unix::SignalKind {
        use tokio::signal::unix::SignalKind;

        match self {
            Self::Interrupt => SignalKind::interrupt(),
            Self::Terminate => SignalKind::terminate(),
            Self::Hangup => SignalKind::hangup(),
            Self::Quit => SignalKind::quit(),
            Self::User1 => SignalKind::user_defined1(),
            Self::User2 => SignalKind::user_defined2(),
        }
    }
}

impl std::str::FromStr for Sig {
    type Err = DeathError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let bare = lower.strip_prefix("sig").unwrap_or(&lower);
        match bare {
            "int" | "interrupt" => Ok(Self::Interrupt),
            "term" | "terminate" => Ok(Self::Terminate),
            "hup" | "hangup" => Ok(Self::Hangup),
            "quit" => Ok(Self::Quit),
            "usr1" | "user1" => Ok(Self::User1),
            "usr2" | "user2" => Ok(Self::User2),
            _ => Err(DeathError::InvalidSignal(s.to_string())),
        }
    }
}

impl std::fmt::Display for Sig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(unix)]
type Stream = tokio::signal::unix::Signal;

#[cfg(windows)]
enum Stream {
    CtrlC(tokio::signal::windows::CtrlC),
    CtrlBreak(tokio::signal::windows::CtrlBreak),
}

#[cfg(windows)]
impl Stream {
    fn poll_recv(&mut self, cx: &mut std::task::Context<'_>) -> Poll<Option<()>> {
        match self {
            Self::CtrlC(s) => s.poll_recv(cx),
            Self::CtrlBreak(s) => s.poll_recv(cx),
        }
    }
}

/// A set of registered OS signals, polled as one source.
pub struct SignalListener {
    streams: Vec<(Sig, Stream)>,
}

impl SignalListener {
    /// Registers interest in `signals`. Must be called inside a tokio runtime.
    ///
    /// Duplicate kinds are registered once. An empty set yields a listener
    /// that never fires.
    pub fn register(signals: &[Sig]) -> Result<Self> {
        let mut streams: Vec<(Sig, Stream)> = Vec::with_capacity(signals.len());
        for &sig in signals {
            if streams.iter().any(|(registered, _)| *registered == sig) {
                continue;
            }
            streams.push((sig, Self::open(sig)?));
        }
        Ok(Self { streams })
    }

    #[cfg(unix)]
    fn open(sig: Sig) -> Result<Stream> {
        tokio::signal::unix::signal(sig.kind())
            .map_err(|e| DeathError::Signal(format!("{}: {}", sig, e)))
    }

    #[cfg(windows)]
    fn open(sig: Sig) -> Result<Stream> {
        use tokio::signal::windows;

        let stream = match sig {
            Sig::Interrupt => windows::ctrl_c().map(Stream::CtrlC),
            Sig::Quit => windows::ctrl_break().map(Stream::CtrlBreak),
            other => return Err(DeathError::UnsupportedSignal(other.to_string())),
        };
        stream.map_err(|e| DeathError::Signal(format!("{}: {}", sig, e)))
    }

    pub fn signals(&self) -> impl Iterator<Item = Sig> + '_ {
        self.streams.iter().map(|(sig, _)| *sig)
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Waits for the next registered signal. Never resolves for an empty set.
    pub async fn recv(&mut self) -> Sig {
        poll_fn(|cx| {
            for (sig, stream) in self.streams.iter_mut() {
                // A closed stream (`Ready(None)`) can no longer fire; skip it.
                if let Poll::Ready(Some(())) = stream.poll_recv(cx) {
                    return Poll::Ready(*sig);
                }
            }
            Poll::Pending
        })
        .await
    }
}

impl std::fmt::Debug for SignalListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.signals()).finish()
    }
}

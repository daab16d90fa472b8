use async_trait::async_trait;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Something that can be released during shutdown.
///
/// `close` is invoked at most once per teardown. The token is cancelled when
/// the teardown deadline passes; implementations that can abort early should
/// watch it, the rest are simply abandoned.
#[async_trait]
pub trait Closable: Send + Sync {
    async fn close(&self, cancel: CancellationToken) -> anyhow::Result<()>;
}

/// A closable handle plus the name and origin used to report on it.
#[derive(Clone)]
pub struct Resource {
    pub(crate) handle: Arc<dyn Closable>,
    name: String,
    origin: String,
}

impl Resource {
    /// Wraps `handle`, naming it after its type.
    pub fn new<T: Closable + 'static>(handle: Arc<T>) -> Self {
        let (name, origin) = identify::<T>();
        Self {
            handle,
            name,
            origin,
        }
    }

    /// Wraps a type-erased handle with an explicit name and origin.
    pub fn named(
        handle: Arc<dyn Closable>,
        name: impl Into<String>,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            handle,
            name: name.into(),
            origin: origin.into(),
        }
    }

    /// Wraps a one-shot async closure.
    pub fn from_fn<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let handle: Arc<dyn Closable> = Arc::new(FnCloser {
            f: Mutex::new(Some(f)),
        });
        Self::named(handle, name, "fn")
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// `origin/name`, as used in reports.
    pub fn path(&self) -> String {
        format!("{}/{}", self.origin, self.name)
    }
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl<T: Closable + 'static> From<Arc<T>> for Resource {
    fn from(handle: Arc<T>) -> Self {
        Self::new(handle)
    }
}

struct FnCloser<F> {
    f: Mutex<Option<F>>,
}

#[async_trait]
impl<F, Fut> Closable for FnCloser<F>
where
    F: FnOnce(CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn close(&self, cancel: CancellationToken) -> anyhow::Result<()> {
        let f = self.f.lock().ok().and_then(|mut slot| slot.take());
        match f {
            Some(f) => f(cancel).await,
            None => Err(anyhow::anyhow!("close already invoked")),
        }
    }
}

/// Name and origin (module path) of `T`, for diagnostics.
///
/// A leading reference is unwrapped once, so `&Pool` and `Pool` identify the
/// same. Generic arguments stay on the name.
pub fn identify<T: ?Sized>() -> (String, String) {
    split_type_path(std::any::type_name::<T>())
}

fn split_type_path(path: &str) -> (String, String) {
    let path = match path.strip_prefix('&') {
        Some(rest) => rest.strip_prefix("mut ").unwrap_or(rest),
        None => path,
    };

    let bytes = path.as_bytes();
    let mut depth = 0usize;
    let mut split = None;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' | b'(' | b'[' => depth += 1,
            // A `->` closes nothing; at the top level it starts a return
            // type, which is not part of the path.
            b'>' if i > 0 && bytes[i - 1] == b'-' => {
                if depth == 0 {
                    break;
                }
            }
            b'>' | b')' | b']' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                split = Some(i);
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }

    match split {
        Some(at) => (path[at + 2..].to_string(), path[..at].to_string()),
        None => (path.to_string(), String::new()),
    }
}

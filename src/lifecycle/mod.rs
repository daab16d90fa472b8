mod component;
mod latch;
mod registry;
mod shutdown;
mod signals;
mod teardown;

pub use component::{identify, Closable, Resource};
pub use latch::{Trigger, TriggerLatch};
pub use registry::ResourceRegistry;
pub use shutdown::{ShutdownCoordinator, ShutdownHandle, ShutdownPhase};
pub use signals::{Sig, SignalListener};
pub use teardown::MassTeardown;

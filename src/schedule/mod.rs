// Time sources, timers and the schedulers built on them
//
// Everything runs on one event loop. Timers never call back into the
// engine directly: they carry a kind label, and whoever drains the queue
// dispatches on it.

mod clock;
mod debounce;
mod refresh;
mod timers;

pub use clock::{Clock, ManualClock, SystemClock, TokioClock};
pub use debounce::ChangeScheduler;
pub use refresh::{RefreshOutcome, RefreshScheduler};
pub use timers::{DueTimer, TimerId, TimerQueue};

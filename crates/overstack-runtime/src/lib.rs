#![forbid(unsafe_code)]

//! Reactive plumbing for overstack.
//!
//! - [`emitter`]: typed, synchronous publish/subscribe with RAII
//!   [`Subscription`]s.
//! - [`scope`]: [`SubscriptionScope`], releasing a group of subscriptions
//!   together.
//! - [`clock`]: [`Clock`] abstraction with wall and manual implementations.
//! - [`timer`]: [`IntervalTimer`], a periodic timer armed only on demand.
//!
//! # Architecture
//!
//! Everything here is single-threaded: shared state lives in
//! `Rc<RefCell<..>>`, handlers are stored as `Weak` references and pruned
//! lazily during emission.

pub mod clock;
pub mod emitter;
pub mod scope;
pub mod timer;

pub use clock::{Clock, Instant, ManualClock, SystemClock};
pub use emitter::{Emitter, EventKind, KindMarker, Subscription};
pub use scope::SubscriptionScope;
pub use timer::IntervalTimer;

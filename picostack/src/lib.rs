//! A single-buffer TCP/IP engine for memory constrained devices.
//!
//! ## Design
//!
//! The whole receive side works with one buffer of 590 bytes. A link driver copies the first
//! bytes of each frame into it, and everything past that stays in device memory where it can be
//! read on demand through the [`Stream`] methods of the [`Link`]. Checksums over the full frame are
//! never computed by the engine: the driver validates them while streaming the frame and reports
//! the result as flags.
//!
//! The send side mirrors this. Headers are built in small stack buffers, payloads are pulled from
//! a [`DataSource`] while the driver writes the frame, and the driver fills in the transport
//! checksum on the way. A TCP segment that must be retransmitted is either copied to the heap or,
//! when its payload comes from a [`Generator`], produced again from scratch.
//!
//! All state lives in an [`Engine`]. A main loop calls [`Engine::run_once`] which advances the
//! timers from a [`Clock`] shared with the timer interrupt, resends overdue segments and handles at
//! most one received frame. Received payloads reach the application through a [`Handler`].
//!
//! [`Stream`]: nic/trait.Stream.html
//! [`Link`]: nic/trait.Link.html
//! [`DataSource`]: wire/trait.DataSource.html
//! [`Generator`]: wire/type.Generator.html
//! [`Engine`]: struct.Engine.html
//! [`Engine::run_once`]: struct.Engine.html#method.run_once
//! [`Clock`]: time/struct.Clock.html
//! [`Handler`]: layer/trait.Handler.html

// tests should be able to use `std`
#![cfg_attr(all(
    not(feature = "std"),
    not(test)),
no_std)]

extern crate alloc;

#[macro_use] mod macros;
pub mod config;
mod engine;
pub mod layer;
pub mod nic;
pub mod time;
pub mod wire;

pub use self::config::Config;
pub use self::engine::{Engine, Stats, BUFFER_LEN};

//! `protohook` runs `protoc` as a packaging build hook.
//!
//! The hook reads `[tool.hatch.build.hooks.protobuf]` from `pyproject.toml`,
//! compiles the project's `.proto` files and registers the generated modules
//! as build artifacts. Planning lives in [`protohook_build`]; this crate is
//! the glue the packaging system and the `protohook` binary call.

mod error;
mod hook;
mod pyproject;

pub use error::HookError;
pub use hook::{BuildData, ProtocHook};
pub use pyproject::HookSettings;

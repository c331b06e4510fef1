//! Type loading for a Haxe front end
//!
//! Given module syntax (as produced by a parser, or deserialized from JSON), the
//! loader resolves type references, instantiates generic declarations, builds
//! structural types and checks class heritage, overriding, interface
//! conformance and final field initialization. Results are declarations in an
//! arena plus a list of diagnostics.

pub mod error_codes;
pub mod logging;
pub mod syntax;
pub mod tast;

pub use tast::{TypeloadConfig, TypeloadContext};

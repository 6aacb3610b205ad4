//! # Validation
//!
//! Composable, stateless validators for attribute values.
//!
//! Every validator is a pure function from a value to [`Diagnostics`]; an
//! empty list means the value was accepted. Primitives cover the shapes that
//! recur across resource schemas, and combinators compose them:
//!
//! - [`any_of`]: accept if at least one alternative accepts (OR)
//! - [`all_of`]: accept only if every validator accepts (AND)
//! - [`each`]: apply a validator to every element of a list
//!
//! ## Example
//!
//! ```
//! use validation::{Validator, any_of, boxed, identifier, string_in_slice, SuffixKind};
//!
//! // Either a network element identifier or the literal "ANY"
//! let v = any_of::<str>(vec![
//!     boxed(identifier(&["ne"], SuffixKind::Numeric)),
//!     boxed(string_in_slice(&["ANY"])),
//! ]);
//!
//! assert!(v.accepts("ne-123"));
//! assert!(v.accepts("ANY"));
//! assert!(!v.accepts("ne-abc"));
//! ```

pub mod combinator;
pub mod diagnostic;
pub mod identifier;
pub mod network;
pub mod numeric;
pub mod strings;

pub use combinator::{BoxedValidator, Validator, all_of, any_of, boxed, each};
pub use diagnostic::{Diagnostic, Diagnostics, Severity};
pub use identifier::{SuffixKind, identifier};
pub use network::{cidr, email, hostname, hostname_or_ipv4, url, wildcard_hostname};
pub use numeric::{int_between, port};
pub use strings::{json, length_between, matches, not_empty, string_in_slice};

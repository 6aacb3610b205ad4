//! Validator trait and logical combinators

use crate::diagnostic::Diagnostics;

/// A pure predicate over a single value
///
/// Implemented for every `Fn(&T) -> Diagnostics`, so plain functions such as
/// [`crate::hostname`] and the closures returned by constructors such as
/// [`crate::string_in_slice`] are validators without any wrapping.
pub trait Validator<T: ?Sized>: Send + Sync {
    /// Check `value`, returning an empty list when it is accepted
    fn validate(&self, value: &T) -> Diagnostics;

    /// Convenience wrapper around [`Validator::validate`]
    fn accepts(&self, value: &T) -> bool {
        !self.validate(value).has_errors()
    }
}

impl<T: ?Sized, F> Validator<T> for F
where
    F: Fn(&T) -> Diagnostics + Send + Sync,
{
    fn validate(&self, value: &T) -> Diagnostics {
        self(value)
    }
}

/// A type-erased validator
pub type BoxedValidator<T> = Box<dyn Validator<T>>;

/// Box a validator for use in a combinator
pub fn boxed<T: ?Sized, V: Validator<T> + 'static>(validator: V) -> BoxedValidator<T> {
    Box::new(validator)
}

/// Accept the value if at least one alternative accepts it
///
/// Alternatives run in order and evaluation stops at the first acceptance.
/// When every alternative rejects, the diagnostics of all of them are
/// returned in order, so the last alternative's rejection is always last.
pub fn any_of<T: ?Sized + 'static>(validators: Vec<BoxedValidator<T>>) -> impl Validator<T> {
    move |value: &T| {
        if validators.is_empty() {
            return Diagnostics::error("no alternatives", "no validator accepted the value");
        }
        let mut rejected = Diagnostics::new();
        for validator in &validators {
            let diags = validator.validate(value);
            if !diags.has_errors() {
                return diags;
            }
            rejected.extend(diags);
        }
        rejected
    }
}

/// Accept the value only if every validator accepts it
///
/// The first rejection is returned and later validators are not run.
pub fn all_of<T: ?Sized + 'static>(validators: Vec<BoxedValidator<T>>) -> impl Validator<T> {
    move |value: &T| {
        let mut warnings = Diagnostics::new();
        for validator in &validators {
            let diags = validator.validate(value);
            if diags.has_errors() {
                return diags;
            }
            warnings.extend(diags);
        }
        warnings
    }
}

/// Apply `validator` to every element of a slice
///
/// Diagnostics are tagged with the element index (`[2]`).
pub fn each<T, U>(validator: BoxedValidator<T>) -> impl Validator<[U]>
where
    T: ?Sized + 'static,
    U: AsRef<T> + Send + Sync + 'static,
{
    move |values: &[U]| {
        let mut diags = Diagnostics::new();
        for (i, value) in values.iter().enumerate() {
            diags.extend(validator.validate(value.as_ref()).at(&format!("[{i}]")));
        }
        diags
    }
}

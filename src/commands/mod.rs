pub mod declarative;
pub mod inspect;

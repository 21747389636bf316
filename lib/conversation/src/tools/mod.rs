//! Built-in tools.

pub mod calculator;
pub mod clock;
pub mod word_counter;

pub use calculator::{CalcError, Calculator, Number};
pub use clock::{CurrentTime, TimeFormat};
pub use word_counter::WordCounter;

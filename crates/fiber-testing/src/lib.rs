//! Testing utilities and harness for fiber renderers

pub mod testing;

pub use testing::*;

pub mod prelude {
    pub use crate::testing::*;
}

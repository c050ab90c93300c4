//! Turn stored figures into the text that gets published.

pub mod aggregate;
pub mod format;
pub mod territorial;

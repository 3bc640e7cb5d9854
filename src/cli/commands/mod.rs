//! One module per subcommand.

pub mod backup;
pub mod restore;

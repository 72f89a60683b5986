//! CLI command implementations.
//!
//! | Module   | Behavior                                         |
//! |----------|--------------------------------------------------|
//! | `serve`  | Default: run the board server                    |
//! | `init`   | `--init`: write an empty board file and exit     |

pub mod init;
pub mod serve;

pub use init::cmd_init;
pub use serve::cmd_serve;

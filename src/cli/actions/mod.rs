pub mod server;

use std::path::PathBuf;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: String,
        origins: Vec<String>,
        assets: Option<PathBuf>,
    },
}

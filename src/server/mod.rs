/// Server management for rs_tty
mod server;

pub use server::{build_router, run_server, serve};
